use kaggleease::catalog::handle::parse_handle;
use kaggleease::catalog::suggest::{levenshtein, normalized_distance, rank, score, MAX_DISTANCE};
use kaggleease::SearchResult;
use proptest::prelude::*;

mod proptest_helpers;

fn entry(handle: &str, votes: u64) -> SearchResult {
    SearchResult {
        handle: handle.to_string(),
        title: String::new(),
        size: 0,
        votes,
    }
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn distance_is_symmetric(a in "[a-z-]{0,12}", b in "[a-z-]{0,12}") {
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        prop_assert_eq!(normalized_distance(&a, &b), normalized_distance(&b, &a));
    }

    #[test]
    fn normalized_distance_is_bounded(a in "\\PC{0,12}", b in "\\PC{0,12}") {
        let d = normalized_distance(&a, &b);
        prop_assert!((0.0..=1.0).contains(&d), "distance {} out of range", d);
    }

    #[test]
    fn distance_is_zero_only_for_equal_strings(a in "[a-z]{0,10}", b in "[a-z]{0,10}") {
        prop_assert_eq!(levenshtein(&a, &b) == 0, a == b);
    }

    #[test]
    fn single_edit_is_distance_one(slug in proptest_helpers::arb_slug(), c in "[a-z]") {
        let extended = format!("{slug}{c}");
        prop_assert_eq!(levenshtein(&slug, &extended), 1);
    }

    #[test]
    fn exact_handle_scores_as_a_near_match(slug in proptest_helpers::arb_slug()) {
        let handle = parse_handle(&slug).expect("slug parses");
        let s = score(&handle.tokens(), handle.as_str(), &entry(&slug, 0));
        prop_assert_eq!(s, 0.0);
    }

    #[test]
    fn ranking_is_ordered_and_bounded(
        scored in prop::collection::vec((0.0f64..1.0, proptest_helpers::arb_slug(), 0u64..1000), 0..12),
        top in 0usize..6,
    ) {
        let input: Vec<(f64, SearchResult)> = scored
            .iter()
            .map(|(d, h, v)| (*d, entry(h, *v)))
            .collect();
        let ranked = rank(input, top);

        prop_assert!(ranked.len() <= top);
        let distance_of = |handle: &String| {
            scored
                .iter()
                .filter(|(_, h, _)| h == handle)
                .map(|(d, _, _)| *d)
                .fold(f64::INFINITY, f64::min)
        };
        for handle in &ranked {
            prop_assert!(distance_of(handle) <= MAX_DISTANCE);
        }
    }
}
