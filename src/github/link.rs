// Link header parsing for GitHub pagination.

use std::collections::HashMap;

/// Parse a `link` header of the form `<url>; rel="name", <url>; rel="name"`
/// into a relation → URL map. Malformed segments are skipped.
pub fn parse_link_header(header: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();

    for part in header.split(',') {
        let mut pieces = part.split(';');
        let Some(target) = pieces.next().map(str::trim) else {
            continue;
        };
        let Some(url) = target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        else {
            continue;
        };

        for param in pieces {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if key.trim() != "rel" {
                continue;
            }
            let value = value.trim().trim_matches('"');
            // rel may list several space-separated relations
            for rel in value.split_whitespace() {
                links.insert(rel.to_string(), url.to_string());
            }
        }
    }

    links
}

/// The `next` page URL, if the header advertises one.
pub fn next_page(header: &str) -> Option<String> {
    parse_link_header(header).remove("next")
}
