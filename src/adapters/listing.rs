//! HTML directory listings shared by the file and zipfs adapters.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::http::response::escape_html;

/// Characters escaped in listing hrefs.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Render `names` (directories carry a trailing `/`) as a `<pre>` listing
/// with relative links; `with_parent` adds a `../` link first.
pub fn render_listing<S: AsRef<str>>(names: &[S], with_parent: bool) -> String {
    let mut html = String::from("<pre>\n");
    if with_parent {
        html.push_str("<a href=\"../\">..</a>\n");
    }
    for name in names {
        let name = name.as_ref();
        let mut href = utf8_percent_encode(name, HREF).to_string();
        // keep "a:b" from reading as a scheme
        if name.contains(':') {
            href.insert_str(0, "./");
        }
        html.push_str(&format!("<a href=\"{}\">{}</a>\n", href, escape_html(name)));
    }
    html.push_str("</pre>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_listing() {
        let html = render_listing(&["a b.txt", "dir/", "<x>"], true);
        assert_eq!(
            html,
            "<pre>\n<a href=\"../\">..</a>\n<a href=\"a%20b.txt\">a b.txt</a>\n<a href=\"dir/\">dir/</a>\n<a href=\"%3Cx%3E\">&lt;x&gt;</a>\n</pre>\n"
        );
    }

    #[test]
    fn test_render_listing_root() {
        let html = render_listing::<&str>(&[], false);
        assert_eq!(html, "<pre>\n</pre>\n");
        assert!(render_listing(&["c:d"], false).contains("href=\"./c:d\""));
    }
}
