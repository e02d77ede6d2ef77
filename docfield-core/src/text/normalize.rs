use std::ops::Range;

/// Folds text into the form used for keyword tests.
///
/// Full-width ASCII becomes half-width, every kind of whitespace (including
/// the ideographic space) is dropped and latin letters are lowercased. The
/// result is used for matching only, never written to the output.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter_map(|ch| {
            let ch = to_half_width(ch);
            (!ch.is_whitespace()).then(|| ch.to_ascii_lowercase())
        })
        .collect()
}

/// Maps a full-width form (U+FF01..U+FF5E) to its ASCII counterpart.
pub fn to_half_width(ch: char) -> char {
    match ch {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(ch as u32 - 0xFEE0).unwrap_or(ch),
        '\u{3000}' => ' ',
        _ => ch,
    }
}

/// Character offset range of the first occurrence of any keyword in an
/// already normalized haystack, together with the keyword that matched.
pub fn find_keyword<'k, S: AsRef<str>>(
    normalized: &str,
    keywords: &'k [S],
) -> Option<(&'k str, usize, usize)> {
    keywords
        .iter()
        .filter_map(|keyword| {
            let keyword: &'k str = <S as AsRef<str>>::as_ref(keyword);
            let needle = normalize(keyword);
            if needle.is_empty() {
                return None;
            }
            normalized.find(&needle).map(|byte_start| {
                let start = normalized[..byte_start].chars().count();
                (keyword, start, start + needle.chars().count())
            })
        })
        .min_by_key(|(_, start, _)| *start)
}

/// Like [`find_keyword`], but over raw text: the match is made on the
/// normalized form and mapped back to a byte range of `text`.
pub fn find_keyword_span<'k, S: AsRef<str>>(
    text: &str,
    keywords: &'k [S],
) -> Option<(&'k str, Range<usize>)> {
    // Byte span of every character that survives normalization
    let kept: Vec<(usize, usize)> = text
        .char_indices()
        .filter(|(_, ch)| !to_half_width(*ch).is_whitespace())
        .map(|(byte, ch)| (byte, byte + ch.len_utf8()))
        .collect();

    let (keyword, start, end) = find_keyword(&normalize(text), keywords)?;
    let (first, _) = kept.get(start)?;
    let (_, last) = kept.get(end.checked_sub(1)?)?;
    Some((keyword, *first..*last))
}

pub fn contains_any<S: AsRef<str>>(normalized: &str, keywords: &[S]) -> bool {
    find_keyword(normalized, keywords).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("姓 名：张三"), "姓名:张三");
        assert_eq!(normalize("ＶＡＬＩＤ　ＴＨＲＵ"), "validthru");
        assert_eq!(normalize("No. 123"), "no.123");
    }

    #[test]
    fn test_find_keyword() {
        let text = normalize("性别男民族汉");
        assert_eq!(find_keyword(&text, &["民族"]), Some(("民族", 3, 5)));
        assert_eq!(find_keyword(&text, &["住址"]), None);

        // Earliest occurrence wins across keywords
        assert_eq!(
            find_keyword(&text, &["民族", "性别"]),
            Some(("性别", 0, 2))
        );

        // Keywords are normalized too
        assert!(contains_any(&normalize("Valid Thru 12/28"), &["VALID THRU"]));
    }

    #[test]
    fn test_find_keyword_span() {
        let text = "民 族 汉";
        let (keyword, span) = find_keyword_span(text, &["民族"]).unwrap();
        assert_eq!(keyword, "民族");
        assert_eq!(&text[span.clone()], "民 族");
        assert_eq!(&text[span.end..], " 汉");

        let text = "卡号：ＶＡＬＩＤ ＴＨＲＵ 09/28";
        let (_, span) = find_keyword_span(text, &["valid thru"]).unwrap();
        assert_eq!(span, 9..37);

        assert!(find_keyword_span("住址", &["民族"]).is_none());
    }
}
