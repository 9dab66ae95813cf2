//! HTML templates for onboarding pages.
//!
//! Fully server-rendered: a step page carries its progress indicator and a
//! CTA link wired up for the completion endpoint; the entry page carries the
//! sign-in form instead.

use crate::catalog::Step;

const PAGE_STYLE: &str = "body{margin:0;background:#050809;color:#e8f1ef;font-family:Inter,system-ui,Arial,sans-serif}\
.wrap{padding:24px}a{color:inherit;text-decoration:none}\
.card{background:rgba(255,255,255,.045);border:1px solid #2b3b3a;border-radius:16px;padding:16px}\
.sub{color:#a8b8b5}.progress{height:6px;background:#0f1a1a;border-radius:3px;margin-bottom:16px}\
.progress i{display:block;height:100%;background:#1fd1b5;border-radius:3px}\
.cta{display:inline-block;margin-top:24px;padding:14px 16px;border-radius:14px;border:1px solid #2b3b3a;background:#0f1a1a;font-weight:600}\
input{padding:14px 12px;border-radius:12px;border:1px solid #2b3b3a;background:#0f1a1a;color:#e8f1ef;width:100%;box-sizing:border-box;margin-bottom:12px}\
.err{display:none;margin-top:8px;padding:10px 12px;border-radius:10px;border:1px solid rgba(255,0,0,.35);background:rgba(255,0,0,.08);color:#ffd0d0;font-size:14px}";

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"/>\
<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\"/>\
<title>{title}</title><style>{PAGE_STYLE}</style></head>\n\
<body><div class=\"wrap\"><div class=\"card\">{body}</div></div></body></html>"
    )
}

/// Render a single onboarding step page.
///
/// `index` is the step's zero-based position and `total` the sequence length;
/// both only feed the progress indicator.
pub fn render_step_page(step: &Step, index: usize, total: usize) -> String {
    let pct = ((index + 1) * 100) / total.max(1);
    let cta = match &step.next_slug {
        Some(next) => format!(
            "<a class=\"cta\" href=\"/onboard/{next}\" data-step=\"{slug}\" data-next=\"{next}\">{label}</a>",
            slug = step.slug,
            label = step.cta_label.as_deref().unwrap_or("Continue"),
        ),
        None => format!(
            "<a class=\"cta\" href=\"/dashboard\" data-step=\"{slug}\" data-next=\"\">Finish</a>",
            slug = step.slug,
        ),
    };

    let body = format!(
        "<div class=\"progress\" aria-label=\"Progress {pct}%\"><i style=\"width:{pct}%\"></i></div>\
<header><h1>{title}</h1><p class=\"sub\">Step {n} of {total} — {slug}</p></header>\
<section>{content}</section>{cta}\
<script src=\"/static/onboard.js\" defer></script>",
        title = step.title,
        n = index + 1,
        slug = step.slug,
        content = step.body_html,
    );
    shell(&step.title, &body)
}

/// Render the sign-in page (the entry step carries a form, not a CTA link).
pub fn render_signin_page(step: &Step) -> String {
    let body = format!(
        "<header><h1>{title}</h1><p class=\"sub\">{content}</p></header>\
<form id=\"signin\" method=\"post\" action=\"/api/auth/signin\">\
<input name=\"email\" inputmode=\"email\" autocomplete=\"email\" placeholder=\"you@company.com\" aria-label=\"Email\" required/>\
<input name=\"password\" type=\"password\" autocomplete=\"current-password\" placeholder=\"Password\" aria-label=\"Password\" required/>\
<button class=\"cta\" type=\"submit\">Continue</button>\
<div id=\"err\" class=\"err\" role=\"alert\"></div>\
</form>\
<script src=\"/static/signin.js\" defer></script>",
        title = step.title,
        content = step.body_html,
    );
    shell(&step.title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> Step {
        Step {
            slug: "connect-data".into(),
            title: "Connect data".into(),
            body_html: "<p>Sync your financial sources.</p>".into(),
            cta_label: Some("Connect".into()),
            next_slug: Some("business-setup".into()),
        }
    }

    #[test]
    fn step_page_has_progress_cta_and_body() {
        let html = render_step_page(&step(), 1, 11);
        assert!(html.contains("Step 2 of 11"));
        assert!(html.contains("Sync your financial sources."));
        assert!(html.contains("href=\"/onboard/business-setup\""));
        assert!(html.contains(">Connect</a>"));
        assert!(html.contains("data-step=\"connect-data\""));
    }

    #[test]
    fn terminal_step_links_to_dashboard() {
        let mut terminal = step();
        terminal.slug = "assistant".into();
        terminal.cta_label = None;
        terminal.next_slug = None;

        let html = render_step_page(&terminal, 10, 11);
        assert!(html.contains("href=\"/dashboard\""));
        assert!(html.contains(">Finish</a>"));
    }

    #[test]
    fn signin_page_has_credentials_form() {
        let mut entry = step();
        entry.slug = "signin".into();
        entry.title = "Sign in".into();

        let html = render_signin_page(&entry);
        assert!(html.contains("action=\"/api/auth/signin\""));
        assert!(html.contains("name=\"email\""));
        assert!(html.contains("name=\"password\""));
    }
}
