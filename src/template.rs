//! `Template = Vec<Literal | Placeholder>`, shared across step text,
//! docstring content and table cells. A template is parsed once per
//! source string and substituted once per Examples row; substitution
//! never re-parses the result, so a substituted value containing `<`
//! or `>` can't accidentally expand again.
//!
//! Built as a small token model rather than a single find-and-replace
//! pass over an owned `String`, so the pickle compiler can report
//! exactly which placeholder name went unresolved.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A string with `<col>` placeholders already split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if c == '<' {
                if let Some(end) = source[chars.peek().map(|(i, _)| *i).unwrap_or(source.len())..]
                    .find('>')
                {
                    let start = chars.peek().map(|(i, _)| *i).unwrap_or(source.len());
                    let name = &source[start..start + end];
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                    // Skip past the consumed placeholder body and its `>`.
                    while let Some((i, ch)) = chars.peek().copied() {
                        chars.next();
                        if ch == '>' {
                            let _ = i;
                            break;
                        }
                    }
                    continue;
                }
            }
            literal.push(c);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Template { segments }
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder using `lookup`. Returns the
    /// rendered string and the list of placeholder names that `lookup`
    /// could not resolve (empty on full success).
    pub fn render(&self, lookup: impl Fn(&str) -> Option<String>) -> (String, Vec<String>) {
        let mut out = String::new();
        let mut unresolved = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('<');
                        out.push_str(name);
                        out.push('>');
                        unresolved.push(name.clone());
                    }
                },
            }
        }
        (out, unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only_has_no_placeholders() {
        let t = Template::parse("I have 12 cucumbers");
        assert_eq!(t.placeholders().count(), 0);
        let (rendered, unresolved) = t.render(|_| None);
        assert_eq!(rendered, "I have 12 cucumbers");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn single_placeholder_substitutes() {
        let t = Template::parse("I have role <role>");
        assert_eq!(t.placeholders().collect::<Vec<_>>(), vec!["role"]);
        let (rendered, unresolved) = t.render(|name| (name == "role").then(|| "admin".to_string()));
        assert_eq!(rendered, "I have role admin");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn unresolved_placeholder_is_reported_and_left_verbatim() {
        let t = Template::parse("<missing> thing");
        let (rendered, unresolved) = t.render(|_| None);
        assert_eq!(rendered, "<missing> thing");
        assert_eq!(unresolved, vec!["missing".to_string()]);
    }

    #[test]
    fn multiple_placeholders_in_one_string() {
        let t = Template::parse("<a> and <b> and <a>");
        let (rendered, unresolved) = t.render(|name| match name {
            "a" => Some("X".to_string()),
            "b" => Some("Y".to_string()),
            _ => None,
        });
        assert_eq!(rendered, "X and Y and X");
        assert!(unresolved.is_empty());
    }
}
