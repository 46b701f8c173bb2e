//! Page-side scripts evaluated through `Runtime.evaluate`.

use crate::util::js_string;

/// Reads page identity and annotates interactive elements with `data-bic-*` markers so the
/// accessibility pass can pick them up through `DOM.describeNode`: landmark, near text, the
/// selector kinds unique in the owning document, the live value, and the owning frame key for
/// elements inside same-origin child frames.
pub const PAGE_PROBE: &str = r#"(() => {
  const text = (el) => ((el && (el.innerText || el.textContent)) || '').replace(/\s+/g, ' ').trim();
  const clip = (s, n) => (s.length > n ? s.slice(0, n) : s);
  const shown = (el) => {
    const rect = el.getBoundingClientRect();
    const style = getComputedStyle(el);
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
  };
  const isModal = (el) => {
    const role = (el.getAttribute('role') || '').toLowerCase();
    return el.tagName === 'DIALOG' || role === 'dialog' || role === 'alertdialog' || el.getAttribute('aria-modal') === 'true';
  };
  const landmarkOf = (el) => {
    for (let n = el; n && n !== el.ownerDocument.documentElement; n = n.parentElement) {
      if (isModal(n)) return 'modal';
      const role = (n.getAttribute('role') || '').toLowerCase();
      const tag = n.tagName.toLowerCase();
      if (role === 'banner' || role === 'alert' || tag === 'header') return 'banner';
      if (role === 'navigation' || tag === 'nav') return 'nav';
      if (role === 'contentinfo' || tag === 'footer') return 'footer';
      if (role === 'main' || tag === 'main') return 'main';
    }
    return 'unknown';
  };
  const nearText = (el) => {
    if (el.id) {
      const label = el.ownerDocument.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (label) return clip(text(label), 80);
    }
    const wrapping = el.closest('label');
    if (wrapping) return clip(text(wrapping), 80);
    const section = el.closest('form, fieldset, section, article');
    const heading = section && section.querySelector('legend, h1, h2, h3, h4');
    return heading ? clip(text(heading), 80) : '';
  };

  const quoted = (value) => '"' + CSS.escape(value) + '"';
  const uniqueKinds = (doc, el) => {
    const tag = el.tagName.toLowerCase();
    const kinds = [];
    if (el.id && doc.querySelectorAll('[id=' + quoted(el.id) + ']').length === 1) kinds.push('id');
    for (const attr of ['name', 'href', 'data-testid']) {
      const value = el.getAttribute(attr);
      if (value && doc.querySelectorAll(tag + '[' + attr + '=' + quoted(value) + ']').length === 1) kinds.push(attr);
    }
    return kinds.join(' ');
  };
  const setOrClear = (el, name, value) => {
    if (value === null || value === '') el.removeAttribute(name);
    else el.setAttribute(name, value);
  };

  const interactive = 'a[href], button, input, select, textarea, option, summary, [role], [tabindex], [contenteditable="true"]';
  const annotate = (doc, frameKey) => {
    for (const el of doc.querySelectorAll(interactive)) {
      el.setAttribute('data-bic-landmark', landmarkOf(el));
      setOrClear(el, 'data-bic-near-text', nearText(el));
      el.setAttribute('data-bic-unique', uniqueKinds(doc, el));
      const control = ['INPUT', 'TEXTAREA', 'SELECT'].includes(el.tagName) && (el.type || '').toLowerCase() !== 'password';
      if (control) el.setAttribute('data-bic-value', el.value);
      else el.removeAttribute('data-bic-value');
      setOrClear(el, 'data-bic-frame-id', frameKey);
    }
  };
  const frameKey = (f, i) => f.id || 'frame-' + i;
  const iframes = Array.from(document.querySelectorAll('iframe'));
  annotate(document, null);
  iframes.forEach((f, i) => {
    let doc = null;
    try { doc = f.contentDocument; } catch (_) { doc = null; }
    if (doc) annotate(doc, frameKey(f, i));
  });

  const modalEls = Array.from(document.querySelectorAll('dialog[open], [role="dialog"], [role="alertdialog"], [aria-modal="true"]')).filter(shown);
  const modals = modalEls.map((el) => {
    const labelled = el.getAttribute('aria-labelledby');
    const byId = labelled && document.getElementById(labelled);
    const heading = el.querySelector('h1, h2, h3, h4');
    const title = el.getAttribute('aria-label') || (byId && text(byId)) || (heading && text(heading)) || '';
    return title ? { title: clip(title, 120) } : {};
  });

  const banners = [];
  for (const el of document.querySelectorAll('[role="alert"], [role="status"], .alert, .banner, .toast')) {
    const t = clip(text(el), 200);
    if (t && shown(el) && !banners.some((b) => b.text === t)) banners.push({ text: t });
  }

  const blockers = [];
  const firstShown = (selector) => Array.from(document.querySelectorAll(selector)).find(shown);
  const cookie = firstShown('[id*="cookie" i], [class*="cookie" i], [id*="consent" i], [class*="consent" i]');
  if (cookie) blockers.push({ kind: 'cookie-consent', label: clip(text(cookie), 80) || undefined });
  if (modalEls.some((el) => el.querySelector('input[type="password"]'))) blockers.push({ kind: 'login-wall' });
  if (firstShown('iframe[src*="captcha"], .g-recaptcha, [class*="captcha" i]')) blockers.push({ kind: 'captcha' });
  const paywall = firstShown('[class*="paywall" i], [id*="paywall" i]');
  if (paywall) blockers.push({ kind: 'paywall', label: clip(text(paywall), 80) || undefined });

  let overlay = { present: false };
  const vw = window.innerWidth, vh = window.innerHeight;
  for (let n = document.elementFromPoint(vw / 2, vh / 2); n && n !== document.body; n = n.parentElement) {
    const position = getComputedStyle(n).position;
    if (position !== 'fixed' && position !== 'sticky') continue;
    const rect = n.getBoundingClientRect();
    if (rect.width * rect.height >= vw * vh * 0.5) {
      const label = clip(n.getAttribute('aria-label') || text(n), 80);
      overlay = label ? { present: true, label } : { present: true };
      if (!isModal(n)) blockers.push({ kind: 'overlay', label: label || undefined });
      break;
    }
  }

  const frames = iframes.map((f, i) => {
    const frame = { frameId: frameKey(f, i), url: f.src || 'about:blank' };
    if (f.name) frame.name = f.name;
    return frame;
  });

  const h1 = document.querySelector('h1, [role="heading"][aria-level="1"]');
  return {
    url: location.href,
    pathname: location.pathname,
    title: document.title || null,
    lang: document.documentElement.lang || null,
    heading: h1 ? clip(text(h1), 200) || null : null,
    readyState: document.readyState,
    modals,
    banners,
    blockers,
    overlay,
    frames,
  };
})()"#;

pub const READY_STATE: &str = "document.readyState";

/// Finds `selector` in the top document, or in the same-origin child frame whose key
/// (`id`, else `frame-<index>`) the page probe wrote into `data-bic-frame-id`.
fn locate(selector: &str, frame: Option<&str>) -> String {
    format!(
        r#"const root = (() => {{
    const key = {frame};
    if (key === null) return document;
    const owner = Array.from(document.querySelectorAll('iframe')).find((f, i) => (f.id || 'frame-' + i) === key);
    try {{ return owner ? owner.contentDocument : null; }} catch (_) {{ return null; }}
  }})();
  const el = root && root.querySelector({selector});
  if (!el) return false;"#,
        frame = frame.map(js_string).unwrap_or_else(|| "null".to_string()),
        selector = js_string(selector)
    )
}

pub fn click(selector: &str, frame: Option<&str>) -> String {
    format!(
        r#"(() => {{
  {locate}
  el.scrollIntoView({{ block: 'center', inline: 'center' }});
  el.click();
  return true;
}})()"#,
        locate = locate(selector, frame)
    )
}

/// Sets the value through the native setter so framework-controlled inputs see the change.
/// Prototypes come from the element's own window so controls inside frames qualify.
pub fn fill(selector: &str, value: &str, frame: Option<&str>) -> String {
    format!(
        r#"(() => {{
  {locate}
  el.focus();
  const view = el.ownerDocument.defaultView;
  const proto = el instanceof view.HTMLTextAreaElement ? view.HTMLTextAreaElement.prototype
    : el instanceof view.HTMLSelectElement ? view.HTMLSelectElement.prototype
    : view.HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
  if (setter && setter.set && (el instanceof view.HTMLInputElement || el instanceof view.HTMLTextAreaElement || el instanceof view.HTMLSelectElement)) {{
    setter.set.call(el, {value});
  }} else if (el.isContentEditable) {{
    el.textContent = {value};
  }} else {{
    return false;
  }}
  el.dispatchEvent(new view.Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new view.Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
        locate = locate(selector, frame),
        value = js_string(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_is_embedded_as_literal() {
        let script = click(r#"input[name="q"]"#, None);
        assert!(script.contains(r#"root.querySelector("input[name=\"q\"]")"#));
        assert!(script.contains("const key = null;"));
    }

    #[test]
    fn fill_escapes_value() {
        let script = fill("#q", "it's \"quoted\"", None);
        assert!(script.contains(r#""it's \"quoted\"""#));
    }

    #[test]
    fn frame_key_routes_lookup() {
        let script = click("#pay", Some("checkout"));
        assert!(script.contains(r#"const key = "checkout";"#));
        assert!(script.contains("owner.contentDocument"));
    }

    #[test]
    fn probe_checks_uniqueness_against_whole_document() {
        assert!(PAGE_PROBE.contains("data-bic-unique"));
        assert!(PAGE_PROBE.contains("doc.querySelectorAll(tag + '['"));
        assert!(PAGE_PROBE.contains("data-bic-value"));
    }
}
