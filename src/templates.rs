//! Small static bundles for smoke runs and tests.
//!
//! Each bundle is a list of `(relative path, contents)` pairs that can be
//! written into a directory and served by the content host.

use std::io;
use std::path::Path;

/// A single self-contained HTML page.
pub fn minimal_page() -> &'static str {
    r##"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Flexbox</title></head>
<body>
    <h1>Flexbox</h1>
    <p>justify-content: center</p>
</body>
</html>
"##
}

/// Page whose layout depends on a stylesheet and a script, so it is only
/// complete once every subresource has loaded.
pub fn styled_page() -> &'static str {
    r##"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Flexbox cheat sheet</title>
    <link rel="stylesheet" href="/assets/sheet.css">
    <script type="module" src="/assets/sheet.js"></script>
</head>
<body>
    <main class="grid">
        <section class="card">
            <h2>flex-row</h2>
            <div class="flex row"><span>1</span><span>2</span><span>3</span></div>
        </section>
        <section class="card">
            <h2>flex-col</h2>
            <div class="flex col"><span>1</span><span>2</span><span>3</span></div>
        </section>
        <section class="card">
            <h2>justify-between</h2>
            <div class="flex row between"><span>1</span><span>2</span><span>3</span></div>
        </section>
    </main>
</body>
</html>
"##
}

pub fn styled_sheet() -> &'static str {
    r##"body { font-family: sans-serif; margin: 0; background: #f8fafc; }
.grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 16px; padding: 16px; }
.card { background: #fff; border: 1px solid #e2e8f0; border-radius: 8px; padding: 12px; }
.flex { display: flex; gap: 8px; }
.row { flex-direction: row; }
.col { flex-direction: column; }
.between { justify-content: space-between; }
.flex span { background: #38bdf8; color: #fff; padding: 4px 10px; border-radius: 4px; }
"##
}

pub fn styled_script() -> &'static str {
    r##"document.body.dataset.ready = "true";
"##
}

/// Page that polls the server every 100 ms, so the network is never quiet
/// long enough to count as idle.
pub fn restless_page() -> &'static str {
    r##"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Polling</title></head>
<body>
    <p>polling</p>
    <script>
        setInterval(() => fetch("/poll?" + Date.now()).catch(() => {}), 100);
    </script>
</body>
</html>
"##
}

/// The files of [`styled_page`] keyed by their served path.
pub fn styled_bundle() -> Vec<(&'static str, &'static str)> {
    vec![
        ("index.html", styled_page()),
        ("assets/sheet.css", styled_sheet()),
        ("assets/sheet.js", styled_script()),
    ]
}

/// Write `files` below `dir`, creating intermediate directories.
pub fn write_bundle(dir: &Path, files: &[(&str, &str)]) -> io::Result<()> {
    for (relative, contents) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
    }
    Ok(())
}
