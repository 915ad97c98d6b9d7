/// Browser page for the put/get/compact flows.
///
/// The script talks to the `/api/*` routes served next to it. Each status
/// element keeps a request counter so a reply that lands after a newer one
/// on the same element is dropped.
pub fn app_html() -> String {
    r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>kv-console</title>
    <style>
        body { font-family: system-ui, sans-serif; margin: 1.5rem; background: #fafafa; }
        main { max-width: 720px; margin: 0 auto; }
        section { background: #fff; border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
        h1, h2 { margin-top: 0; }
        label { display: block; margin: 0.4rem 0 0.2rem; font-weight: 600; }
        input, button { font: inherit; }
        input { width: 100%; padding: 0.5rem; border: 1px solid #ccc; border-radius: 6px; box-sizing: border-box; }
        .actions { margin-top: 0.6rem; }
        button { padding: 0.5rem 0.8rem; border: 1px solid #888; border-radius: 6px; background: #f5f5f5; cursor: pointer; }
        .status { margin-top: 0.6rem; min-height: 1.2rem; }
        .success { color: #1a7f37; }
        .error { color: #cf222e; }
    </style>
</head>
<body>
    <main>
        <h1>Key-Value Store</h1>

        <section>
            <h2>Put</h2>
            <label for="put-key">Key</label>
            <input id="put-key" placeholder="key" />
            <label for="put-value">Value</label>
            <input id="put-value" placeholder="value" />
            <div class="actions"><button onclick="putData()">Put</button></div>
            <div id="put-status" class="status"></div>
        </section>

        <section>
            <h2>Get</h2>
            <label for="get-key">Key</label>
            <input id="get-key" placeholder="key" />
            <div class="actions"><button onclick="getData()">Get</button></div>
            <div id="get-status" class="status"></div>
        </section>

        <section>
            <h2>Compact</h2>
            <div class="actions"><button onclick="compactData()">Compact</button></div>
            <div id="compact-status" class="status"></div>
        </section>
    </main>

    <script>
        const issued = { put: 0, get: 0, compact: 0 };
        const applied = { put: 0, get: 0, compact: 0 };

        async function run(operation, url, options) {
            const ticket = ++issued[operation];
            let outcome;
            try {
                const response = await fetch(url, options);
                outcome = await response.json();
            } catch (err) {
                outcome = { operation, kind: 'network_error', message: `Network error: ${err.message}`, cleared_fields: [] };
            }

            if (ticket < applied[operation]) {
                return;
            }
            applied[operation] = ticket;

            const status = document.getElementById(`${operation}-status`);
            status.textContent = outcome.message;
            status.className = 'status ' + (outcome.kind === 'success' ? 'success' : 'error');
            for (const field of outcome.cleared_fields || []) {
                document.getElementById(field).value = '';
            }
        }

        function putData() {
            const key = document.getElementById('put-key').value;
            const value = document.getElementById('put-value').value;
            run('put', '/api/put', {
                method: 'POST',
                headers: { 'content-type': 'application/json' },
                body: JSON.stringify({ key, value })
            });
        }

        function getData() {
            const key = document.getElementById('get-key').value;
            run('get', '/api/get?' + new URLSearchParams({ key }).toString());
        }

        function compactData() {
            run('compact', '/api/compact', { method: 'POST' });
        }
    </script>
</body>
</html>
"#
    .to_string()
}
