use proptest::prelude::*;

use vigil_core::match_keywords;

proptest! {
    #[test]
    fn matches_are_distinct(title in "\\PC{0,40}", keywords in prop::collection::vec("[a-zA-Z]{1,8}", 0..12)) {
        let matched = match_keywords(&title, &keywords);
        let mut lowered: Vec<String> = matched.iter().map(|k| k.to_lowercase()).collect();
        lowered.sort();
        lowered.dedup();
        prop_assert_eq!(lowered.len(), matched.len());
    }

    #[test]
    fn every_match_is_a_substring(title in "\\PC{0,40}", keywords in prop::collection::vec("[a-zA-Z]{1,8}", 0..12)) {
        let haystack = title.to_lowercase();
        for kw in match_keywords(&title, &keywords) {
            prop_assert!(haystack.contains(&kw.to_lowercase()));
        }
    }

    #[test]
    fn matching_is_deterministic(title in "\\PC{0,40}", keywords in prop::collection::vec("[a-zA-Z]{1,8}", 0..12)) {
        prop_assert_eq!(match_keywords(&title, &keywords), match_keywords(&title, &keywords));
    }
}
