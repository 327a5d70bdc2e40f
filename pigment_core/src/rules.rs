// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule tracking across style sheets.
//!
//! The tracker remembers every style rule that carries a paint reference,
//! keyed by [`RuleKey`]. A scan walks every readable sheet, compares what it
//! finds against the table and reports which selectors need their targets
//! re-evaluated. Rules whose key is revisited with identical text cost one
//! hash lookup.
//!
//! Removals are applied only after every sheet has been walked, so deleting a
//! rule never disturbs the occurrence counters of rules still present.

use core::hash::Hash;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::host::{CssRule, SurfaceContents};
use crate::id::{RuleKey, SurfaceId, normalize_selector};
use crate::syntax::{escape_paint_references, has_paint};

/// One sheet as presented to [`RuleTracker::scan`].
#[derive(Clone, Debug)]
pub struct SurfaceInput<S, R> {
    /// Host handle of the sheet.
    pub surface: S,
    /// Its current contents.
    pub contents: SurfaceContents<R>,
}

/// The tracker's record of one paint-carrying style rule.
#[derive(Clone, Debug)]
pub struct TrackedRule<R> {
    /// Selector exactly as last seen.
    pub selector: String,
    /// Declaration text as last seen.
    pub last_text: String,
    /// Live handle into the host's rule tree.
    pub handle: R,
}

/// What a scan found.
#[derive(Clone, Debug)]
pub struct ScanOutcome<R> {
    /// Selectors of rules that are new or whose text changed, deduplicated.
    pub changed_selectors: Vec<String>,
    /// Rules that disappeared, with the selector they had.
    pub removed: Vec<(RuleKey, String)>,
    /// Whether a sheet scanned for the first time carries paint references.
    pub new_paint_surface: bool,
    /// Rules of first-time sheets whose raw `paint(…)` text should be
    /// replaced with the escaped form.
    pub rewrites: Vec<(R, String)>,
    /// Sheets found unreadable in this scan; they are never scanned again.
    pub unreadable: Vec<SurfaceId>,
    /// Sheets that were skipped because they are still loading.
    pub pending: usize,
    /// Set when a sheet is waiting on nested imports: scan again after this.
    pub retry_after: Option<Duration>,
    /// Number of sheets walked.
    pub scanned: usize,
}

impl<R> Default for ScanOutcome<R> {
    fn default() -> Self {
        Self {
            changed_selectors: Vec::new(),
            removed: Vec::new(),
            new_paint_surface: false,
            rewrites: Vec::new(),
            unreadable: Vec::new(),
            pending: 0,
            retry_after: None,
            scanned: 0,
        }
    }
}

impl<R> ScanOutcome<R> {
    /// Whether any target may need re-evaluation.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changed_selectors.is_empty() || !self.removed.is_empty() || self.new_paint_surface
    }

    /// Returns one selector list covering every changed and removed rule.
    #[must_use]
    pub fn requery_selector(&self) -> Option<String> {
        let mut seen = HashSet::new();
        let selectors: Vec<&str> = self
            .changed_selectors
            .iter()
            .map(String::as_str)
            .chain(self.removed.iter().map(|(_, s)| s.as_str()))
            .filter(|s| seen.insert(*s))
            .collect();
        (!selectors.is_empty()).then(|| selectors.join(", "))
    }
}

/// Table of tracked rules plus per-sheet bookkeeping.
#[derive(Debug)]
pub struct RuleTracker<S, R> {
    surfaces: HashMap<S, SurfaceId>,
    next_surface: u32,
    scanned_once: HashSet<SurfaceId>,
    unreadable: HashSet<SurfaceId>,
    import_wait_started: HashMap<SurfaceId, Instant>,
    tracked: HashMap<RuleKey, TrackedRule<R>>,
}

impl<S, R> Default for RuleTracker<S, R> {
    fn default() -> Self {
        Self {
            surfaces: HashMap::new(),
            next_surface: 0,
            scanned_once: HashSet::new(),
            unreadable: HashSet::new(),
            import_wait_started: HashMap::new(),
            tracked: HashMap::new(),
        }
    }
}

impl<S: Clone + Eq + Hash, R: Clone> RuleTracker<S, R> {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identity of `surface`, assigning one on first sight.
    pub fn surface_id(&mut self, surface: &S) -> SurfaceId {
        if let Some(id) = self.surfaces.get(surface) {
            return *id;
        }
        self.next_surface += 1;
        let id = SurfaceId(self.next_surface);
        self.surfaces.insert(surface.clone(), id);
        id
    }

    /// Whether `surface` has been found unreadable.
    #[must_use]
    pub fn is_unreadable(&self, surface: &S) -> bool {
        self.surfaces
            .get(surface)
            .is_some_and(|id| self.unreadable.contains(id))
    }

    /// Looks up a tracked rule.
    #[must_use]
    pub fn get(&self, key: &RuleKey) -> Option<&TrackedRule<R>> {
        self.tracked.get(key)
    }

    /// Iterates over every tracked rule.
    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, &TrackedRule<R>)> {
        self.tracked.iter()
    }

    /// Number of tracked rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether no rule is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Returns every tracked selector, deduplicated, joined into one list.
    #[must_use]
    pub fn tracked_selector_list(&self) -> Option<String> {
        let mut selectors: Vec<&str> = self.tracked.values().map(|t| t.selector.as_str()).collect();
        selectors.sort_unstable();
        selectors.dedup();
        (!selectors.is_empty()).then(|| selectors.join(", "))
    }

    /// Walks `surfaces` and updates the table.
    ///
    /// Pending sheets contribute nothing and keep their rules. Readable sheets
    /// that still wait on nested imports are held back for at most
    /// `import_wait` from the first time they were seen waiting.
    pub fn scan(
        &mut self,
        surfaces: Vec<SurfaceInput<S, R>>,
        now: Instant,
        import_wait: Duration,
    ) -> ScanOutcome<R> {
        let mut outcome = ScanOutcome::default();
        let mut present = HashSet::new();
        let mut walked = HashSet::new();
        let mut seen = HashSet::new();
        let mut changed = HashSet::new();

        for input in surfaces {
            let id = self.surface_id(&input.surface);
            present.insert(id);
            if self.unreadable.contains(&id) {
                continue;
            }
            let rules = match input.contents {
                SurfaceContents::Pending => {
                    outcome.pending += 1;
                    continue;
                }
                SurfaceContents::Unreadable => {
                    self.unreadable.insert(id);
                    outcome.unreadable.push(id);
                    continue;
                }
                SurfaceContents::Ready {
                    rules,
                    pending_imports,
                } => {
                    if pending_imports {
                        let started = *self.import_wait_started.entry(id).or_insert(now);
                        let waited = now.saturating_duration_since(started);
                        if waited < import_wait {
                            let remaining = import_wait - waited;
                            outcome.retry_after = Some(
                                outcome
                                    .retry_after
                                    .map_or(remaining, |r| r.min(remaining)),
                            );
                            continue;
                        }
                    }
                    self.import_wait_started.remove(&id);
                    rules
                }
            };

            let first_scan = self.scanned_once.insert(id);
            walked.insert(id);
            outcome.scanned += 1;
            self.walk(id, &rules, first_scan, &mut seen, &mut changed, &mut outcome);
        }

        // Batch removal: rules of walked sheets that were not revisited, and
        // every rule of a sheet that is gone.
        let stale: Vec<RuleKey> = self
            .tracked
            .keys()
            .filter(|key| {
                (walked.contains(&key.surface) && !seen.contains(*key))
                    || !present.contains(&key.surface)
            })
            .cloned()
            .collect();
        for key in stale {
            if let Some(rule) = self.tracked.remove(&key) {
                outcome.removed.push((key, rule.selector));
            }
        }
        self.import_wait_started.retain(|id, _| present.contains(id));
        self.scanned_once.retain(|id| present.contains(id));
        // Unreadable sheets are never handed in again but stay denied.
        self.surfaces
            .retain(|_, id| present.contains(id) || self.unreadable.contains(id));
        outcome
    }

    fn walk(
        &mut self,
        surface: SurfaceId,
        rules: &[CssRule<R>],
        first_scan: bool,
        seen: &mut HashSet<RuleKey>,
        changed: &mut HashSet<String>,
        outcome: &mut ScanOutcome<R>,
    ) {
        let mut occurrences: HashMap<String, u32> = HashMap::new();
        let mut stack = vec![rules.iter()];
        while let Some(frame) = stack.last_mut() {
            let Some(rule) = frame.next() else {
                stack.pop();
                continue;
            };
            let (selector, text, handle) = match rule {
                CssRule::Style {
                    selector,
                    text,
                    handle,
                } => (selector, text, handle),
                CssRule::Group {
                    condition_holds: true,
                    rules,
                } => {
                    stack.push(rules.iter());
                    continue;
                }
                CssRule::Group { rules, .. } => {
                    if first_scan {
                        collect_rewrites(rules, &mut outcome.rewrites);
                    }
                    continue;
                }
                CssRule::Other => continue,
            };

            let normalized = normalize_selector(selector);
            let occurrence = occurrences
                .entry(normalized)
                .and_modify(|n| *n += 1)
                .or_insert(1);
            if !has_paint(text) {
                continue;
            }
            // Rules are compared in escaped form, whether or not the host
            // applied the rewrite.
            let text = match escape_paint_references(text) {
                Cow::Owned(escaped) => {
                    if first_scan {
                        outcome.rewrites.push((handle.clone(), escaped.clone()));
                    }
                    escaped
                }
                Cow::Borrowed(_) => text.clone(),
            };
            if first_scan {
                outcome.new_paint_surface = true;
            }

            let key = RuleKey::new(surface, selector, *occurrence);
            seen.insert(key.clone());
            let mark = match self.tracked.get_mut(&key) {
                Some(tracked) if tracked.selector == *selector => {
                    tracked.handle = handle.clone();
                    if tracked.last_text == text {
                        false
                    } else {
                        tracked.last_text = text;
                        true
                    }
                }
                Some(tracked) => {
                    outcome
                        .removed
                        .push((key.clone(), core::mem::take(&mut tracked.selector)));
                    *tracked = TrackedRule {
                        selector: selector.clone(),
                        last_text: text,
                        handle: handle.clone(),
                    };
                    true
                }
                None => {
                    self.tracked.insert(
                        key,
                        TrackedRule {
                            selector: selector.clone(),
                            last_text: text,
                            handle: handle.clone(),
                        },
                    );
                    true
                }
            };
            if mark && changed.insert(selector.clone()) {
                outcome.changed_selectors.push(selector.clone());
            }
        }
    }
}

/// Escapes raw references in rules a walk does not enter, so they parse
/// once their group starts to apply.
fn collect_rewrites<R: Clone>(rules: &[CssRule<R>], rewrites: &mut Vec<(R, String)>) {
    for rule in rules {
        match rule {
            CssRule::Style { text, handle, .. } => {
                if let Cow::Owned(escaped) = escape_paint_references(text) {
                    rewrites.push((handle.clone(), escaped));
                }
            }
            CssRule::Group { rules, .. } => collect_rewrites(rules, rewrites),
            CssRule::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Tracker = RuleTracker<&'static str, u32>;

    fn style(selector: &str, text: &str, handle: u32) -> CssRule<u32> {
        CssRule::Style {
            selector: selector.into(),
            text: text.into(),
            handle,
        }
    }

    fn sheet(name: &'static str, rules: Vec<CssRule<u32>>) -> SurfaceInput<&'static str, u32> {
        SurfaceInput {
            surface: name,
            contents: SurfaceContents::ready(rules),
        }
    }

    fn scan(tracker: &mut Tracker, sheets: Vec<SurfaceInput<&'static str, u32>>) -> ScanOutcome<u32> {
        tracker.scan(sheets, Instant::now(), Duration::from_secs(1))
    }

    const PAINTED: &str = "background-image: paint(dots);";

    #[test]
    fn unchanged_sheet_is_stable() {
        let mut tracker = Tracker::new();
        let rules = || vec![style(".a", PAINTED, 1), style(".b", "color: red;", 2)];
        let first = scan(&mut tracker, vec![sheet("s", rules())]);
        assert_eq!(first.changed_selectors, [".a"]);
        assert!(first.new_paint_surface);
        let keys: HashSet<RuleKey> = tracker.iter().map(|(k, _)| k.clone()).collect();

        let second = scan(&mut tracker, vec![sheet("s", rules())]);
        assert!(!second.has_changes(), "second scan: {second:?}");
        let again: HashSet<RuleKey> = tracker.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, again);
    }

    #[test]
    fn occurrence_counts_every_style_rule() {
        let mut tracker = Tracker::new();
        let rules = vec![
            style(".a", "color: red;", 1),
            style(".a", PAINTED, 2),
            style(".a", "color: red;", 3),
        ];
        scan(&mut tracker, vec![sheet("s", rules)]);
        assert_eq!(tracker.len(), 1);
        let (key, rule) = tracker.iter().next().unwrap();
        assert_eq!(key.occurrence, 2);
        assert_eq!(rule.handle, 2);
    }

    #[test]
    fn text_change_marks_selector() {
        let mut tracker = Tracker::new();
        scan(&mut tracker, vec![sheet("s", vec![style(".a", PAINTED, 1)])]);
        let outcome = scan(
            &mut tracker,
            vec![sheet(
                "s",
                vec![style(".a", "background-image: paint(rings);", 1)],
            )],
        );
        assert_eq!(outcome.changed_selectors, [".a"]);
        assert!(outcome.removed.is_empty());
        assert!(!outcome.new_paint_surface, "sheet was seen before");
    }

    #[test]
    fn removed_rules_are_reported_after_the_walk() {
        let mut tracker = Tracker::new();
        scan(
            &mut tracker,
            vec![sheet("s", vec![style(".a", PAINTED, 1), style(".b", PAINTED, 2)])],
        );
        let outcome = scan(&mut tracker, vec![sheet("s", vec![style(".b", PAINTED, 2)])]);
        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.removed[0].1, ".a");
        assert!(outcome.changed_selectors.is_empty());
        assert_eq!(outcome.requery_selector().as_deref(), Some(".a"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn vanished_sheet_drops_its_rules() {
        let mut tracker = Tracker::new();
        scan(
            &mut tracker,
            vec![
                sheet("s", vec![style(".a", PAINTED, 1)]),
                sheet("t", vec![style(".b", PAINTED, 2)]),
            ],
        );
        let outcome = scan(&mut tracker, vec![sheet("t", vec![style(".b", PAINTED, 2)])]);
        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(tracker.tracked_selector_list().as_deref(), Some(".b"));
    }

    #[test]
    fn only_true_conditional_groups_are_entered() {
        let mut tracker = Tracker::new();
        let rules = vec![
            CssRule::Group {
                condition_holds: true,
                rules: vec![CssRule::Group {
                    condition_holds: true,
                    rules: vec![style(".deep", PAINTED, 1)],
                }],
            },
            CssRule::Group {
                condition_holds: false,
                rules: vec![style(".hidden", PAINTED, 2)],
            },
            CssRule::Other,
        ];
        let outcome = scan(&mut tracker, vec![sheet("s", rules)]);
        assert_eq!(outcome.changed_selectors, [".deep"]);
        // Both are escaped on first sight, entered or not.
        let handles: Vec<u32> = outcome.rewrites.iter().map(|(h, _)| *h).collect();
        assert_eq!(handles, [1, 2]);
    }

    #[test]
    fn pending_sheet_contributes_nothing_and_keeps_rules() {
        let mut tracker = Tracker::new();
        scan(&mut tracker, vec![sheet("s", vec![style(".a", PAINTED, 1)])]);
        let outcome = tracker.scan(
            vec![SurfaceInput {
                surface: "s",
                contents: SurfaceContents::Pending,
            }],
            Instant::now(),
            Duration::from_secs(1),
        );
        assert_eq!(outcome.pending, 1);
        assert!(!outcome.has_changes());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn unreadable_sheet_is_reported_once() {
        let mut tracker = Tracker::new();
        let unreadable = || SurfaceInput {
            surface: "x",
            contents: SurfaceContents::<u32>::Unreadable,
        };
        let first = scan(&mut tracker, vec![unreadable()]);
        assert_eq!(first.unreadable.len(), 1);
        assert!(tracker.is_unreadable(&"x"));
        let second = scan(&mut tracker, vec![unreadable()]);
        assert!(second.unreadable.is_empty());
    }

    #[test]
    fn import_wait_is_bounded() {
        let mut tracker = Tracker::new();
        let start = Instant::now();
        let wait = Duration::from_millis(500);
        let waiting = || SurfaceInput {
            surface: "remote",
            contents: SurfaceContents::Ready {
                rules: vec![style(".a", PAINTED, 1)],
                pending_imports: true,
            },
        };
        let held = tracker.scan(vec![waiting()], start, wait);
        assert_eq!(held.scanned, 0);
        assert_eq!(held.retry_after, Some(wait));

        let later = tracker.scan(vec![waiting()], start + Duration::from_millis(200), wait);
        assert_eq!(later.retry_after, Some(Duration::from_millis(300)));

        let expired = tracker.scan(vec![waiting()], start + wait, wait);
        assert_eq!(expired.scanned, 1);
        assert_eq!(expired.changed_selectors, [".a"]);
    }

    #[test]
    fn first_scan_offers_escaped_rewrites() {
        let mut tracker = Tracker::new();
        let outcome = scan(
            &mut tracker,
            vec![sheet(
                "s",
                vec![
                    style(".a", PAINTED, 7),
                    style(".b", "mask-image: url(data:image/paint-m,=);", 8),
                ],
            )],
        );
        assert_eq!(
            outcome.rewrites,
            [(7, "background-image: url(data:image/paint-dots,=);".to_owned())]
        );
        let again = scan(&mut tracker, vec![sheet("s", vec![style(".a", PAINTED, 7)])]);
        assert!(again.rewrites.is_empty());
    }

    #[test]
    fn applied_rewrite_is_not_an_edit() {
        let mut tracker = Tracker::new();
        scan(&mut tracker, vec![sheet("s", vec![style(".a", PAINTED, 7)])]);
        let rewritten = "background-image: url(data:image/paint-dots,=);";
        let outcome = scan(&mut tracker, vec![sheet("s", vec![style(".a", rewritten, 7)])]);
        assert!(!outcome.has_changes());
    }

    #[test]
    fn unapplied_rewrite_is_not_an_edit() {
        let mut tracker = Tracker::new();
        let first = scan(&mut tracker, vec![sheet("s", vec![style(".a", PAINTED, 7)])]);
        assert_eq!(first.rewrites.len(), 1);
        for _ in 0..2 {
            let outcome = scan(&mut tracker, vec![sheet("s", vec![style(".a", PAINTED, 7)])]);
            assert!(!outcome.has_changes(), "{outcome:?}");
        }
    }

    #[test]
    fn vanished_sheet_is_seen_fresh_on_return() {
        let mut tracker = Tracker::new();
        let painted = || sheet("s", vec![style(".a", PAINTED, 1)]);
        let before = tracker.surface_id(&"s");
        scan(&mut tracker, vec![painted()]);
        scan(&mut tracker, Vec::new());

        let back = scan(&mut tracker, vec![painted()]);
        assert!(back.new_paint_surface);
        assert_eq!(back.rewrites.len(), 1);
        assert_ne!(tracker.surface_id(&"s"), before);
    }

    #[test]
    fn skipped_unreadable_sheet_stays_denied() {
        let mut tracker = Tracker::new();
        scan(
            &mut tracker,
            vec![SurfaceInput {
                surface: "x",
                contents: SurfaceContents::Unreadable,
            }],
        );
        scan(&mut tracker, Vec::new());
        assert!(tracker.is_unreadable(&"x"));
    }

    #[test]
    fn whitespace_only_selector_edit_replaces_the_record() {
        let mut tracker = Tracker::new();
        scan(&mut tracker, vec![sheet("s", vec![style(".a  .b", PAINTED, 1)])]);
        let outcome = scan(&mut tracker, vec![sheet("s", vec![style(".a .b", PAINTED, 1)])]);
        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.changed_selectors, [".a .b"]);
        assert_eq!(tracker.len(), 1);
    }
}
