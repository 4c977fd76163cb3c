use pulldown_cmark::{Event, Parser, Tag, TagEnd};

struct Heading {
    level: usize,
    text: String,
    start: usize,
    end: usize,
}

fn headings(body: &str) -> Vec<Heading> {
    let mut found = Vec::new();
    let mut open: Option<(usize, usize, String)> = None;

    for (event, range) in Parser::new(body).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                open = Some((level as usize, range.start, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, buf)) = open.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, start, text)) = open.take() {
                    found.push(Heading {
                        level,
                        text,
                        start,
                        end: range.end,
                    });
                }
            }
            _ => {}
        }
    }
    found
}

/// Text under the markdown heading named `name`, up to the next heading of
/// the same or a higher level.
///
/// Heading text matches case-insensitively, ignoring a trailing colon.
#[must_use]
pub fn section<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    let all = headings(body);
    let wanted = name.trim();
    let index = all.iter().position(|heading| {
        heading
            .text
            .trim()
            .trim_end_matches(':')
            .eq_ignore_ascii_case(wanted)
    })?;

    let heading = &all[index];
    let until = all[index + 1..]
        .iter()
        .find(|next| next.level <= heading.level)
        .map_or(body.len(), |next| next.start);

    Some(body[heading.end..until].trim())
}
