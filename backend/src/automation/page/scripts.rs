//! Page-side functions evaluated over CDP.
//!
//! Each template is an arrow function. Placeholders are replaced with JSON
//! literals, so selectors and reply text never need manual escaping.

const SELECTORS: &str = "__SELECTORS__";
const INPUT_SELECTORS: &str = "__INPUT_SELECTORS__";
const BUTTON_SELECTORS: &str = "__BUTTON_SELECTORS__";
const TEXT: &str = "__TEXT__";

const OPEN_INBOX: &str = r#"
() => {
    if (window.location.pathname.includes('/direct')) return 'present';
    const selectors = __SELECTORS__;
    for (const sel of selectors) {
        const link = document.querySelector(sel);
        if (link) {
            link.click();
            return 'clicked';
        }
    }
    return 'missing';
}
"#;

const CHAT_TITLE: &str = r#"
() => {
    const selectors = __SELECTORS__;
    for (const sel of selectors) {
        const el = document.querySelector(sel);
        const text = el && el.textContent ? el.textContent.trim() : '';
        if (text) return text;
    }
    return null;
}
"#;

const MESSAGE_SNAPSHOT: &str = r#"
() => {
    const selectors = __SELECTORS__;
    let nodes = [];
    for (const sel of selectors) {
        nodes = Array.from(document.querySelectorAll(sel));
        if (nodes.length > 0) break;
    }
    const flexEnd = '[style*="justify-content: flex-end"]';
    return nodes.map(el => {
        const style = window.getComputedStyle(el);
        const parent = el.parentElement;
        const parentStyle = parent && parent.style ? parent.style : null;
        return {
            text: (el.textContent || '').trim(),
            signals: {
                classList: Array.from(el.classList),
                outgoingTestId: el.querySelector('[data-testid*="outgoing"]') !== null,
                outgoingMessageTestId: el.querySelector('[data-testid="outgoing-message"]') !== null,
                justifyContent: style.justifyContent || '',
                textAlign: style.textAlign || '',
                ancestorFlexEnd: el.closest(flexEnd) !== null,
                descendantFlexEnd: el.querySelector(flexEnd) !== null,
                descendantDivFlexEnd: el.querySelector('div' + flexEnd) !== null,
                descendantRightAlign: el.querySelector('[style*="text-align: right"]') !== null,
                parentJustifyContent: parentStyle ? parentStyle.justifyContent || '' : '',
                parentTextAlign: parentStyle ? parentStyle.textAlign || '' : '',
            },
        };
    });
}
"#;

const FILL_INPUT: &str = r#"
() => {
    const selectors = __INPUT_SELECTORS__;
    const text = __TEXT__;
    let input = null;
    for (const sel of selectors) {
        input = document.querySelector(sel);
        if (input) break;
    }
    if (!input) return null;
    input.focus();
    if (input.tagName === 'TEXTAREA') {
        input.value = text;
    } else {
        input.textContent = text;
    }
    input.dispatchEvent(new Event('input', { bubbles: true }));
    input.dispatchEvent(new Event('change', { bubbles: true }));
    return input.tagName.toLowerCase();
}
"#;

const PRESS_SEND: &str = r#"
() => {
    const inputSelectors = __INPUT_SELECTORS__;
    const buttonSelectors = __BUTTON_SELECTORS__;
    let button = null;
    for (const sel of buttonSelectors) {
        button = Array.from(document.querySelectorAll(sel)).find(btn => {
            const label = (btn.getAttribute('aria-label') || '').toLowerCase();
            const text = (btn.textContent || '').toLowerCase();
            const icon = btn.querySelector('svg') !== null && btn.offsetParent !== null;
            return label.includes('send') || text.includes('send') || icon;
        }) || null;
        if (button) break;
    }
    if (button && !button.disabled) {
        button.click();
        return 'clicked';
    }
    let input = null;
    for (const sel of inputSelectors) {
        input = document.querySelector(sel);
        if (input) break;
    }
    if (!input) return 'missing';
    input.dispatchEvent(new KeyboardEvent('keydown', { key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }));
    return 'enter';
}
"#;

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn json_text(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn open_inbox(links: &[String]) -> String {
    OPEN_INBOX.replace(SELECTORS, &json_list(links))
}

pub fn chat_title(selectors: &[String]) -> String {
    CHAT_TITLE.replace(SELECTORS, &json_list(selectors))
}

pub fn message_snapshot(containers: &[String]) -> String {
    MESSAGE_SNAPSHOT.replace(SELECTORS, &json_list(containers))
}

pub fn fill_input(inputs: &[String], text: &str) -> String {
    // Text goes in last so a reply containing a placeholder name stays intact.
    FILL_INPUT
        .replace(INPUT_SELECTORS, &json_list(inputs))
        .replace(TEXT, &json_text(text))
}

pub fn press_send(inputs: &[String], buttons: &[String]) -> String {
    PRESS_SEND
        .replace(INPUT_SELECTORS, &json_list(inputs))
        .replace(BUTTON_SELECTORS, &json_list(buttons))
}
