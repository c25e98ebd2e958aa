//! Form submission
//!
//! Collects a form's successful controls and turns the submission into a
//! request URL plus fetch options.

use fos_dom::{Document, DomTree, ElementQuery, NodeId};
use fos_net::{FetchOptions, FormData, Method, RequestBody, UrlSearchParams};
use url::Url;

/// Request derived from a submitted form
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub url: Url,
    pub options: FetchOptions,
}

/// Successful controls of `form`, in tree order
pub fn collect_form_data(tree: &DomTree, form: NodeId) -> FormData {
    let mut data = FormData::new();

    for node in tree.descendants(form) {
        let Some(elem) = tree.element(node) else { continue };
        let Some(name) = elem.get_attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if elem.has_attr("disabled") || in_disabled_fieldset(tree, node, form) {
            continue;
        }

        match elem.name.as_str() {
            "input" => {
                let kind = elem.get_attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "reset" | "button" | "image" | "file" => {}
                    "checkbox" | "radio" => {
                        if elem.has_attr("checked") {
                            data.append(name, elem.get_attr("value").unwrap_or("on"));
                        }
                    }
                    _ => data.append(name, elem.get_attr("value").unwrap_or_default()),
                }
            }
            "textarea" => data.append(name, &tree.text_content(node)),
            "select" => {
                for value in selected_options(tree, node, elem.has_attr("multiple")) {
                    data.append(name, &value);
                }
            }
            _ => {}
        }
    }

    data
}

fn in_disabled_fieldset(tree: &DomTree, node: NodeId, form: NodeId) -> bool {
    tree.ancestors(node)
        .take_while(|&a| a != form)
        .any(|a| tree.tag_name(a) == Some("fieldset") && tree.attr(a, "disabled").is_some())
}

fn selected_options(tree: &DomTree, select: NodeId, multiple: bool) -> Vec<String> {
    let options: Vec<NodeId> = tree
        .get_elements_by_tag_name(select, "option")
        .into_iter()
        .filter(|&o| tree.attr(o, "disabled").is_none())
        .collect();

    let mut chosen: Vec<NodeId> = options
        .iter()
        .copied()
        .filter(|&o| tree.attr(o, "selected").is_some())
        .collect();
    if !multiple {
        chosen.truncate(1);
        if chosen.is_empty() {
            chosen.extend(options.first().copied());
        }
    }

    chosen
        .into_iter()
        .map(|o| match tree.attr(o, "value") {
            Some(v) => v.to_string(),
            None => tree.text_content(o).split_whitespace().collect::<Vec<_>>().join(" "),
        })
        .collect()
}

/// Build the request for submitting `form`, or `None` when the submission
/// should be left to the browser (unresolvable or cross-origin action)
pub fn build_submission(document: &Document, form: NodeId, location: &Url) -> Option<FormSubmission> {
    let tree = document.tree();
    let mut action = match tree.attr(form, "action").map(str::trim).filter(|a| !a.is_empty()) {
        Some(action) => location.join(action).ok()?,
        None => location.clone(),
    };
    if action.scheme() != location.scheme() || action.host_str() != location.host_str() {
        tracing::debug!("form action {} is cross-origin", action);
        return None;
    }

    let method = tree
        .attr(form, "method")
        .and_then(|m| m.parse::<Method>().ok())
        .filter(|m| *m == Method::Post)
        .unwrap_or(Method::Get);
    let data = collect_form_data(tree, form);

    let options = if method == Method::Get {
        let query = UrlSearchParams::from(&data);
        action.set_query((!query.is_empty()).then(|| query.to_string()).as_deref());
        FetchOptions::new().method(Method::Get)
    } else {
        let multipart = tree
            .attr(form, "enctype")
            .is_some_and(|e| e.to_ascii_lowercase().contains("form-data"));
        let body = if multipart {
            RequestBody::Multipart(data)
        } else {
            RequestBody::UrlEncoded(UrlSearchParams::from(&data))
        };
        FetchOptions::new().method(Method::Post).body(body)
    };

    Some(FormSubmission { url: action, options })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_net::FormDataValue;

    fn submit(html: &str) -> Option<FormSubmission> {
        let document = fos_html::parse(html);
        let form = document.query_selector("form").unwrap();
        build_submission(&document, form, &Url::parse("http://site.test/page?old=1").unwrap())
    }

    #[test]
    fn test_collects_successful_controls() {
        let document = fos_html::parse(
            r#"<form>
                <input name="q" value="rust">
                <input name="off" value="x" disabled>
                <input type="checkbox" name="a" checked>
                <input type="checkbox" name="b" value="1">
                <input type="radio" name="r" value="two" checked>
                <input type="submit" name="go" value="Go">
                <input name="">
                <textarea name="t">line</textarea>
                <select name="s"><option>First  one</option><option value="2">Two</option></select>
                <select name="m" multiple><option value="x" selected>X</option><option value="y" selected>Y</option></select>
                <fieldset disabled><input name="inner" value="i"></fieldset>
            </form>"#,
        );
        let form = document.query_selector("form").unwrap();
        let data = collect_form_data(document.tree(), form);

        let pairs: Vec<(String, String)> = data
            .entries()
            .map(|(k, v)| match v {
                FormDataValue::String(s) => (k.to_string(), s.clone()),
                FormDataValue::File(f) => (k.to_string(), f.name.clone()),
            })
            .collect();
        let expected = [
            ("q", "rust"),
            ("a", "on"),
            ("r", "two"),
            ("t", "line"),
            ("s", "First one"),
            ("m", "x"),
            ("m", "y"),
        ];
        let expected: Vec<(String, String)> =
            expected.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_get_form_sets_query() {
        let submission = submit(r#"<form action="/search"><input name="q" value="a b"><input name="n" value="1"></form>"#)
            .unwrap();
        assert_eq!(submission.url.as_str(), "http://site.test/search?q=a+b&n=1");
        assert_eq!(submission.options.method, Some(Method::Get));
        assert!(submission.options.body.is_none());
    }

    #[test]
    fn test_missing_action_uses_document_url() {
        let submission = submit(r#"<form><input name="q" value="x"></form>"#).unwrap();
        assert_eq!(submission.url.as_str(), "http://site.test/page?q=x");
    }

    #[test]
    fn test_post_urlencoded() {
        let submission = submit(r#"<form method="post" action="/save"><input name="k" value="v"></form>"#).unwrap();
        assert_eq!(submission.url.as_str(), "http://site.test/save");
        assert_eq!(
            submission.options.body,
            Some(RequestBody::UrlEncoded(UrlSearchParams::parse("k=v")))
        );
    }

    #[test]
    fn test_post_multipart_keeps_form_data() {
        let submission = submit(
            r#"<form method="POST" enctype="multipart/form-data" action="/up"><input name="k" value="v"></form>"#,
        )
        .unwrap();
        let mut expected = FormData::new();
        expected.append("k", "v");
        assert_eq!(submission.options.body, Some(RequestBody::Multipart(expected)));
    }

    #[test]
    fn test_cross_origin_action_is_native() {
        assert!(submit(r#"<form action="http://elsewhere.test/x"></form>"#).is_none());
    }
}
