//! Folding ranges, computed from one scan of the text.

use xmlls_dom::{Document, Scanner, TokenKind};

use crate::cancel::CancelChecker;
use crate::settings::SharedSettings;
use crate::types::{FoldingRange, FoldingRangeKind};

#[derive(Debug, Default)]
pub struct XmlFoldings;

/// An element or `#region` waiting for its end.
struct Open<'a> {
    start_line: u32,
    /// `None` for a region marker.
    tag: Option<&'a str>,
}

impl XmlFoldings {
    pub fn new() -> Self {
        Self
    }

    pub fn get_folding_ranges(
        &self,
        document: &Document,
        settings: &SharedSettings,
        cancel: &dyn CancelChecker,
    ) -> Vec<FoldingRange> {
        let include_closing_tag = settings.foldings.include_closing_tag_in_fold;
        let line = |offset: usize| document.position_at(offset).map_or(0, |p| p.line);
        let closing_line = |offset: usize| {
            let l = line(offset);
            if include_closing_tag { l } else { l.saturating_sub(1) }
        };

        let mut ranges = Vec::new();
        let mut stack: Vec<Open<'_>> = Vec::new();
        let mut last_tag = None;
        let mut prev_start = None;
        let mut markup_start = 0;

        let mut scanner = if document.is_dtd() {
            Scanner::for_dtd(document.text())
        } else {
            Scanner::new(document.text())
        };
        let mut token = scanner.scan_token();
        while token != TokenKind::Eos {
            if cancel.is_cancelled() {
                break;
            }
            let (start, end) = (scanner.token_offset(), scanner.token_end());
            match token {
                TokenKind::StartTag => {
                    let tag = scanner.token_text();
                    stack.push(Open {
                        start_line: line(start),
                        tag: Some(tag),
                    });
                    last_tag = Some(tag);
                }
                TokenKind::EndTag => last_tag = Some(scanner.token_text()),
                TokenKind::StartTagSelfClose | TokenKind::EndTagClose => {
                    let Some(index) = last_tag
                        .and_then(|tag| stack.iter().rposition(|open| open.tag == Some(tag)))
                    else {
                        token = scanner.scan_token();
                        continue;
                    };
                    let start_line = stack[index].start_line;
                    stack.truncate(index);
                    let end_line = if token == TokenKind::EndTagClose {
                        closing_line(start)
                    } else {
                        line(start)
                    };
                    if end_line > start_line && prev_start != Some(start_line) {
                        ranges.push(FoldingRange::new(start_line, end_line));
                        prev_start = Some(start_line);
                    }
                }
                TokenKind::StartCommentTag
                | TokenKind::CDataTagOpen
                | TokenKind::StartPrologOrPI
                | TokenKind::DtdStartInternalSubset => markup_start = start,
                TokenKind::Comment => {
                    let start_line = line(markup_start);
                    let text = scanner.token_text().trim_start();
                    if text.starts_with("#region") {
                        stack.push(Open {
                            start_line,
                            tag: None,
                        });
                    } else if text.starts_with("#endregion") {
                        if let Some(index) = stack.iter().rposition(|open| open.tag.is_none()) {
                            let region_start = stack[index].start_line;
                            stack.truncate(index);
                            if start_line > region_start {
                                ranges.push(FoldingRange::with_kind(
                                    region_start,
                                    start_line,
                                    FoldingRangeKind::Region,
                                ));
                            }
                        }
                    } else if line(end) > start_line {
                        ranges.push(FoldingRange::with_kind(
                            start_line,
                            line(end),
                            FoldingRangeKind::Comment,
                        ));
                    }
                }
                TokenKind::CDataTagClose | TokenKind::PIEnd | TokenKind::PrologEnd => {
                    let start_line = line(markup_start);
                    if line(end) > start_line {
                        ranges.push(FoldingRange::new(start_line, line(end)));
                    }
                }
                TokenKind::DtdEndInternalSubset => {
                    let start_line = line(markup_start);
                    let end_line = closing_line(start);
                    if end_line > start_line {
                        ranges.push(FoldingRange::new(start_line, end_line));
                    }
                }
                _ => {}
            }
            token = scanner.scan_token();
        }

        ranges.sort_by_key(|r| (r.start_line, r.end_line));
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use xmlls_dom::parse;

    const TEXT: &str = "<root>
  <a>
    <b/>
  </a>
  <!--
    comment
  -->
  <!-- #region -->
  <c/>
  <!-- #endregion -->
  <![CDATA[
  x
  ]]>
</root>";

    fn folds(text: &str, settings: &SharedSettings) -> Vec<(u32, u32, Option<FoldingRangeKind>)> {
        let doc = parse(text, "file:///fold.xml");
        XmlFoldings::new()
            .get_folding_ranges(&doc, settings, &NeverCancel)
            .into_iter()
            .map(|r| (r.start_line, r.end_line, r.kind))
            .collect()
    }

    #[test]
    fn test_elements_comments_regions_cdata() {
        assert_eq!(
            folds(TEXT, &SharedSettings::default()),
            vec![
                (0, 12, None),
                (1, 2, None),
                (4, 6, Some(FoldingRangeKind::Comment)),
                (7, 9, Some(FoldingRangeKind::Region)),
                (10, 12, None),
            ]
        );
    }

    #[test]
    fn test_include_closing_tag() {
        let mut settings = SharedSettings::default();
        settings.foldings.include_closing_tag_in_fold = true;
        let ranges = folds(TEXT, &settings);
        assert_eq!(ranges[0], (0, 13, None));
        assert_eq!(ranges[1], (1, 3, None));
    }

    #[test]
    fn test_internal_subset_and_multiline_tag() {
        let text = "<!DOCTYPE r [\n<!ELEMENT r ANY>\n]>\n<r\n  a=\"1\"/>";
        assert_eq!(
            folds(text, &SharedSettings::default()),
            vec![(0, 1, None), (3, 4, None)]
        );
    }
}
