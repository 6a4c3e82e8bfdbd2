use super::*;

#[test]
fn parse_accepts_aliases() {
    assert_eq!(IconHint::parse("lightbulb"), Some(IconHint::Insight));
    assert_eq!(IconHint::parse("Check-Circle"), Some(IconHint::Check));
    assert_eq!(IconHint::parse(" refresh "), Some(IconHint::Retry));
}

#[test]
fn unknown_names_resolve_to_no_icon() {
    assert_eq!(IconHint::parse("unicorn"), None);
    assert_eq!(glyph_for(Some("unicorn")), None);
    assert_eq!(glyph_for(None), None);
}

#[test]
fn glyph_for_known_name() {
    assert_eq!(glyph_for(Some("merge")), Some("⇄"));
}
