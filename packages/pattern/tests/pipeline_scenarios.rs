//! End-to-end scenarios for learning, excluding and refining a pattern.

use pattern::{
    location_strings, refine, AutoExcludeConfig, Confidence, ElementKey, FingerprintArena,
    HtmlPage, HtmlSnapshot, MatchConfig, MatchPipeline, Page, PatternError, Selection, Strategy,
};

const STORE_PAGE: &str = r#"
<html>
  <head><title>Cafes</title></head>
  <body>
    <header><div class="nav">Home</div></header>
    <main id="results">
      <div class="listing"><span class="addr">123 Main St, Springfield</span></div>
      <div class="listing"><span class="addr">456 Oak Ave, Springfield</span></div>
      <div class="listing"><span class="addr">789 Pine Rd, Springfield</span></div>
      <div class="listing"><span class="addr">12 Birch Ln, Springfield</span></div>
      <div class="listing"><span class="addr">345 Cedar Ct, Springfield</span></div>
    </main>
    <footer><div class="legal">(c) 2024</div></footer>
  </body>
</html>
"#;

const PAGE_WITH_AD: &str = r#"
<html>
  <body>
    <main id="results">
      <div class="listing"><span class="addr">123 Main St, Springfield</span></div>
      <div class="listing"><span class="addr">456 Oak Ave, Springfield</span></div>
      <div class="listing sponsored" data-ad="1"><a href="https://ads.example.com">Ad</a><span>Sponsored listing</span></div>
      <div class="listing"><span class="addr">789 Pine Rd, Springfield</span></div>
      <div class="listing"><span class="addr">12 Birch Ln, Springfield</span></div>
    </main>
  </body>
</html>
"#;

/// A page that refuses some selector queries, to force strategies to fail.
struct RejectingPage<'a, 'b, F: Fn(ElementKey, &str) -> bool> {
    inner: &'a HtmlSnapshot<'b>,
    rejects: F,
}

impl<F: Fn(ElementKey, &str) -> bool> Page for RejectingPage<'_, '_, F> {
    fn root(&self) -> ElementKey {
        self.inner.root()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn tag(&self, key: ElementKey) -> &str {
        self.inner.tag(key)
    }

    fn classes(&self, key: ElementKey) -> Vec<&str> {
        self.inner.classes(key)
    }

    fn attributes(&self, key: ElementKey) -> Vec<(&str, &str)> {
        self.inner.attributes(key)
    }

    fn text(&self, key: ElementKey) -> String {
        self.inner.text(key)
    }

    fn parent(&self, key: ElementKey) -> Option<ElementKey> {
        self.inner.parent(key)
    }

    fn children(&self, key: ElementKey) -> &[ElementKey] {
        self.inner.children(key)
    }

    fn select(&self, scope: ElementKey, selector: &str) -> pattern::Result<Vec<ElementKey>> {
        if (self.rejects)(scope, selector) {
            return Err(PatternError::SelectorInvalid {
                selector: selector.to_string(),
                reason: "rejected by test page".to_string(),
            });
        }
        self.inner.select(scope, selector)
    }
}

#[test]
fn test_listing_scenario_uses_common_selector() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let listings = snap.find("div.listing").unwrap();
    assert_eq!(listings.len(), 5);
    assert_eq!(snap.text(listings[0]), "123 Main St, Springfield");
    assert_eq!(snap.text(listings[1]), "456 Oak Ave, Springfield");

    let result = MatchPipeline::default().run(&snap, &listings[..2]).unwrap();

    let selector = result.selector.clone().unwrap();
    assert_eq!(selector.query, "div.listing");
    assert_eq!(selector.strategy, Strategy::CommonSelector);
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.matches, listings);
}

#[test]
fn test_pipeline_is_idempotent() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let listings = snap.find("div.listing").unwrap();
    let pipeline = MatchPipeline::default();

    let first = pipeline.run(&snap, &[listings[3], listings[0]]).unwrap();
    let second = pipeline.run(&snap, &[listings[3], listings[0]]).unwrap();
    assert_eq!(first, second);

    // A fresh parse of the same markup gives the same answer too
    let reparsed = HtmlPage::parse(STORE_PAGE);
    let resnap = reparsed.snapshot();
    let third = pipeline.run(&resnap, &[listings[3], listings[0]]).unwrap();
    assert_eq!(first, third);
}

#[test]
fn test_invalid_selectors_fall_through_to_ancestor_scan() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let listings = snap.find("div.listing").unwrap();
    let rejecting = RejectingPage {
        inner: &snap,
        rejects: |_: ElementKey, selector: &str| selector.contains('.'),
    };

    let result = MatchPipeline::default().run(&rejecting, &listings[..2]).unwrap();

    let selector = result.selector.unwrap();
    assert_eq!(selector.strategy, Strategy::AncestorScan);
    assert_eq!(selector.query, "#results div");
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.matches, listings);
}

#[test]
fn test_global_fallback_is_low_confidence() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let listings = snap.find("div.listing").unwrap();
    let root = snap.root();
    let rejecting = RejectingPage {
        inner: &snap,
        rejects: move |scope: ElementKey, selector: &str| scope != root || selector.contains('.'),
    };

    let result = MatchPipeline::default().run(&rejecting, &listings[..2]).unwrap();

    assert_eq!(result.strategy(), Some(Strategy::GlobalScan));
    assert_eq!(result.confidence, Confidence::Low);
    // Header and footer divs stay below the lowered threshold
    assert_eq!(result.matches, listings);
}

#[test]
fn test_every_strategy_failing_gives_empty_result() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let listings = snap.find("div.listing").unwrap();
    let rejecting = RejectingPage {
        inner: &snap,
        rejects: |_: ElementKey, _: &str| true,
    };

    let result = MatchPipeline::default().run(&rejecting, &listings[..2]).unwrap();
    assert!(result.is_empty());
    assert!(result.selector.is_none());
    assert_eq!(result.confidence, Confidence::Low);
}

#[test]
fn test_single_sample_is_rejected() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let listings = snap.find("div.listing").unwrap();

    let err = MatchPipeline::default().run(&snap, &listings[..1]).unwrap_err();
    assert!(matches!(err, PatternError::NotEnoughSamples { count: 1 }));
}

#[test]
fn test_excluding_an_unlike_match_excludes_only_itself() {
    let page = HtmlPage::parse(PAGE_WITH_AD);
    let snap = page.snapshot();
    let arena = FingerprintArena::build(&snap, "mapmark-");
    let listings = snap.find("div.listing").unwrap();
    let ad = snap.find("div.sponsored").unwrap()[0];
    let samples = [listings[0], listings[1]];

    let result = MatchPipeline::default().run(&snap, &samples).unwrap();
    assert!(result.contains(ad));

    let mut selection = Selection::new();
    for sample in samples {
        selection.add_sample(&snap, sample).unwrap();
    }
    selection.apply_matches(&snap, &result);

    let newly = selection
        .exclude(&snap, &arena, ad, &AutoExcludeConfig::default())
        .unwrap();
    assert_eq!(newly, vec![ad]);
    assert_eq!(selection.active_matches().len(), 4);
}

#[test]
fn test_excluding_a_look_alike_cascades() {
    let page = HtmlPage::parse(PAGE_WITH_AD);
    let snap = page.snapshot();
    let arena = FingerprintArena::build(&snap, "mapmark-");
    let listings = snap.find("div.listing").unwrap();
    let ad = snap.find("div.sponsored").unwrap()[0];
    let plain: Vec<ElementKey> = listings.iter().copied().filter(|k| *k != ad).collect();

    let mut selection = Selection::new();
    selection.add_sample(&snap, plain[0]).unwrap();
    selection.add_sample(&snap, plain[1]).unwrap();
    let result = MatchPipeline::default().run(&snap, &selection.samples()).unwrap();
    selection.apply_matches(&snap, &result);

    let newly = selection
        .exclude(&snap, &arena, plain[2], &AutoExcludeConfig::default())
        .unwrap();

    // The other plain listing goes with it; samples and the ad stay
    assert_eq!(newly, vec![plain[2], plain[3]]);
    assert_eq!(selection.active_matches(), vec![plain[0], plain[1], ad]);
}

#[test]
fn test_refinement_never_readmits_excluded_paths() {
    let page = HtmlPage::parse(STORE_PAGE);
    let snap = page.snapshot();
    let arena = FingerprintArena::build(&snap, "mapmark-");
    let listings = snap.find("div.listing").unwrap();
    let config = MatchConfig::default();

    let mut selection = Selection::new();
    selection.add_sample(&snap, listings[0]).unwrap();
    selection.add_sample(&snap, listings[1]).unwrap();
    let result = MatchPipeline::new(config.clone()).run(&snap, &selection.samples()).unwrap();
    selection.apply_matches(&snap, &result);

    // Structurally identical to the rest, excluded without cascade
    selection
        .exclude(&snap, &arena, listings[2], &AutoExcludeConfig::disabled())
        .unwrap();

    let refined = refine(&snap, &selection, &config).unwrap();
    assert_eq!(refined.matches.len(), 4);
    assert!(!refined.contains(listings[2]));

    // Path identity survives a re-parse of the same page
    let reparsed = HtmlPage::parse(STORE_PAGE);
    let resnap = reparsed.snapshot();
    let refined_again = refine(&resnap, &selection, &config).unwrap();
    assert_eq!(refined_again.matches, refined.matches);
}

#[test]
fn test_refine_after_excluding_the_ad() {
    let page = HtmlPage::parse(PAGE_WITH_AD);
    let snap = page.snapshot();
    let arena = FingerprintArena::build(&snap, "mapmark-");
    let ad = snap.find("div.sponsored").unwrap()[0];
    let plain: Vec<ElementKey> = snap
        .find("div.listing")
        .unwrap()
        .into_iter()
        .filter(|k| *k != ad)
        .collect();
    let config = MatchConfig::default();

    let mut selection = Selection::new();
    selection.add_sample(&snap, plain[0]).unwrap();
    selection.add_sample(&snap, plain[1]).unwrap();
    let result = MatchPipeline::new(config.clone()).run(&snap, &selection.samples()).unwrap();
    selection.apply_matches(&snap, &result);
    selection
        .exclude(&snap, &arena, ad, &AutoExcludeConfig::default())
        .unwrap();

    let refined = refine(&snap, &selection, &config).unwrap();
    assert_eq!(refined.matches, plain);
    assert_eq!(
        location_strings(&snap, &refined.matches),
        vec![
            "123 Main St, Springfield",
            "456 Oak Ave, Springfield",
            "789 Pine Rd, Springfield",
            "12 Birch Ln, Springfield",
        ]
    );
}
