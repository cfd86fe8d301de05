//! The single-page question form
//!
//! Served inline; there is no asset pipeline. The page submits to
//! `POST /v1/ask` and renders the answer, or the raw payload dump when the
//! response shape was not recognized.

use axum::response::Html;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>ClinBridge</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; color: #1a1a2e; }
  h1 { font-size: 1.4rem; }
  label { display: block; margin-top: 1rem; font-weight: 600; }
  textarea, select { width: 100%; margin-top: 0.25rem; padding: 0.5rem; font: inherit; box-sizing: border-box; }
  textarea[name=question] { height: 6rem; }
  textarea[name=findings] { height: 8rem; font-family: monospace; }
  button { margin-top: 1rem; padding: 0.5rem 1.5rem; font: inherit; cursor: pointer; }
  button:disabled { cursor: wait; }
  #output { margin-top: 1.5rem; white-space: pre-wrap; }
  #output.error { color: #b00020; }
  #output.raw { font-family: monospace; background: #f4f4f6; padding: 1rem; }
  #meta { margin-top: 0.5rem; color: #666; font-size: 0.85rem; }
</style>
</head>
<body>
<h1>ClinBridge</h1>
<p>Ask a clinical question. Optional structured findings are forwarded to the
workflow service as-is.</p>

<form id="ask-form">
  <label>Question
    <textarea name="question" placeholder="e.g. Is metformin contraindicated in CKD stage 4?"></textarea>
  </label>
  <label>Audience
    <select name="audience">
      <option value="clinician">Clinician</option>
      <option value="patient">Patient</option>
    </select>
  </label>
  <label>Findings JSON (optional)
    <textarea name="findings" placeholder='{"hba1c": 8.1, "egfr": 28}'></textarea>
  </label>
  <button type="submit">Ask</button>
</form>

<div id="output"></div>
<div id="meta"></div>

<script>
const form = document.getElementById("ask-form");
const output = document.getElementById("output");
const meta = document.getElementById("meta");

form.addEventListener("submit", async (event) => {
  event.preventDefault();
  const question = form.question.value;
  if (!question.trim()) {
    output.className = "error";
    output.textContent = "Please enter a question.";
    return;
  }

  const body = { question, audience: form.audience.value };
  if (form.findings.value.trim()) {
    body.findings_json = form.findings.value;
  }

  const button = form.querySelector("button");
  button.disabled = true;
  output.className = "";
  output.textContent = "Waiting for the workflow service…";
  meta.textContent = "";

  try {
    const response = await fetch("/v1/ask", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify(body),
    });
    const result = await response.json();

    if (!response.ok) {
      output.className = "error";
      output.textContent = result.error ? result.error.message : JSON.stringify(result);
    } else if (result.answer !== undefined) {
      output.className = "";
      output.textContent = result.answer;
      meta.textContent = "source: " + result.source + " · " + result.elapsed_ms + " ms";
    } else {
      output.className = "raw";
      output.textContent = JSON.stringify(result.raw, null, 2);
      meta.textContent = "no recognized answer field · " + result.elapsed_ms + " ms";
    }
  } catch (err) {
    output.className = "error";
    output.textContent = "Request failed: " + err;
  } finally {
    button.disabled = false;
  }
});
</script>
</body>
</html>
"#;

/// Serve the form page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
