// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Browser upload form served at `/`

use axum::response::Html;

use crate::pipeline::{LanguageSelector, DEFAULT_BOX_THRESHOLD, DEFAULT_IOU_THRESHOLD};

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Screen Parser</title>
<style>
  body { font-family: sans-serif; margin: 2rem; max-width: 1200px; }
  .row { display: flex; gap: 2rem; flex-wrap: wrap; }
  .col { flex: 1; min-width: 320px; }
  label { display: block; margin-top: 1rem; }
  img { max-width: 100%; border: 1px solid #ccc; }
  textarea { width: 100%; height: 24rem; font-family: monospace; }
  .error { color: #b00020; }
</style>
</head>
<body>
<h1>Screen Parser</h1>
<p>Upload a screenshot to detect, caption and number its GUI elements.</p>
<div class="row">
  <div class="col">
    <form id="parse-form">
      <label>Image <input type="file" name="image" accept="image/*" required></label>
      <label>Box Threshold <output id="box-value">{box}</output>
        <input type="range" name="box_threshold" min="0.01" max="1.0" step="0.01" value="{box}"
               oninput="document.getElementById('box-value').value = this.value"></label>
      <label>IOU Threshold <output id="iou-value">{iou}</output>
        <input type="range" name="iou_threshold" min="0.01" max="1.0" step="0.01" value="{iou}"
               oninput="document.getElementById('iou-value').value = this.value"></label>
      <label>Language
        <select name="language">{languages}</select></label>
      <p><button type="submit">Submit</button></p>
    </form>
    <p id="status"></p>
  </div>
  <div class="col">
    <img id="annotated" alt="Annotated screenshot">
    <label>Parsed screen elements<textarea id="parsed" readonly></textarea></label>
  </div>
</div>
<script>
document.getElementById('parse-form').addEventListener('submit', async (event) => {
  event.preventDefault();
  const status = document.getElementById('status');
  status.className = '';
  status.textContent = 'Parsing...';
  try {
    const response = await fetch('/v1/parse/upload', { method: 'POST', body: new FormData(event.target) });
    const body = await response.json();
    if (!response.ok) {
      status.className = 'error';
      status.textContent = body.message || response.statusText;
      return;
    }
    document.getElementById('annotated').src = 'data:image/png;base64,' + body.annotatedImage;
    document.getElementById('parsed').value = body.parsedText;
    status.textContent = `Done in ${body.processingTimeMs} ms (language: ${body.effectiveLanguage})`;
  } catch (err) {
    status.className = 'error';
    status.textContent = err.toString();
  }
});
</script>
</body>
</html>
"#;

/// Render the upload form with the default control values
pub fn render_index() -> String {
    let languages: String = LanguageSelector::ALL
        .iter()
        .map(|lang| {
            let selected = if *lang == LanguageSelector::default() { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, lang, selected)
        })
        .collect();

    INDEX_TEMPLATE
        .replace("{box}", &format!("{:.2}", DEFAULT_BOX_THRESHOLD))
        .replace("{iou}", &format!("{:.2}", DEFAULT_IOU_THRESHOLD))
        .replace("{languages}", &languages)
}

/// GET / - upload form
pub async fn index_handler() -> Html<String> {
    Html(render_index())
}
