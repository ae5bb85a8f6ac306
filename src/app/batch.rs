use crate::recording::{Outcome, RecordingIndex, Recorder};

#[derive(Debug, Default)]
pub(crate) struct Summary {
    pub(crate) outcomes: Vec<(RecordingIndex, Outcome)>,
    pub(crate) interrupted: bool,
}

impl Summary {
    fn numbers_where(&self, keep: impl Fn(&Outcome) -> bool) -> Vec<u32> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| keep(outcome))
            .map(|(index, _)| index.get())
            .collect()
    }

    pub(crate) fn successful(&self) -> Vec<u32> {
        self.numbers_where(Outcome::is_success)
    }

    pub(crate) fn skipped(&self) -> Vec<u32> {
        self.numbers_where(|outcome| matches!(outcome, Outcome::Skipped))
    }

    pub(crate) fn failed(&self) -> Vec<u32> {
        self.numbers_where(|outcome| {
            matches!(
                outcome,
                Outcome::Failed(_) | Outcome::MergeFailed(_) | Outcome::Ambiguous(_)
            )
        })
    }

    pub(crate) fn has_merge_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, Outcome::MergeFailed(_)))
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        let mut section = |label: &str, numbers: Vec<u32>, note: &str| {
            out.push_str(&format!("  {label:<11} {} videos{note}\n", numbers.len()));
            if !numbers.is_empty() {
                out.push_str(&format!("    {numbers:?}\n"));
            }
        };
        section("Successful:", self.successful(), "");
        section("Skipped:", self.skipped(), " (already downloaded)");
        section("Failed:", self.failed(), "");
        if self.interrupted {
            out.push_str("  Interrupted: remaining recordings were not attempted\n");
        }
        if self.has_merge_failures() {
            out.push_str("  Some merges failed; fix ffmpeg and run with --merge\n");
        }
        out
    }
}

/// Runs the recorder over `indices` in order. A failing index never stops
/// the batch; only a user interrupt does.
pub(crate) fn drive(
    recorder: &mut Recorder<'_>,
    indices: impl IntoIterator<Item = RecordingIndex>,
    total: u64,
) -> Summary {
    let mut summary = Summary::default();

    for (position, index) in indices.into_iter().enumerate() {
        println!(
            "\n--- Recording {} ({}/{total}) ---",
            index.get(),
            position + 1
        );
        let outcome = recorder.process(index);
        println!("  {}", outcome.describe(index));

        let stop = outcome == Outcome::Interrupted;
        summary.outcomes.push((index, outcome));
        if stop {
            summary.interrupted = true;
            break;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaMerger;
    use crate::recording::Policy;
    use crate::testing::*;

    fn range(start: u32, end: u32) -> Vec<RecordingIndex> {
        (start..=end).map(idx).collect()
    }

    fn run_batch(
        dir: &std::path::Path,
        fetcher: &FakeFetcher,
        missing: Vec<u32>,
        indices: &[RecordingIndex],
    ) -> (Summary, FakeResolver) {
        let mut resolver = FakeResolver {
            missing,
            ..FakeResolver::default()
        };
        let merger = FakeMerger::default();
        let cookies = cookies();
        let summary = {
            let mut recorder = Recorder::new(
                dir,
                &mut resolver,
                fetcher,
                Some(&merger as &dyn MediaMerger),
                &cookies,
                Policy::default(),
            );
            drive(&mut recorder, indices.iter().copied(), indices.len() as u64)
        };
        (summary, resolver)
    }

    #[test]
    fn failed_resolution_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().expect("temp dir");
        let fetcher = FakeFetcher::new(Produces::Combined);

        let (summary, resolver) = run_batch(dir.path(), &fetcher, vec![3], &range(1, 5));

        assert_eq!(resolver.calls, range(1, 5));
        assert_eq!(summary.outcomes.len(), 5);
        assert!(matches!(summary.outcomes[2].1, Outcome::Failed(_)));
        assert_eq!(summary.outcomes[3], (idx(4), Outcome::Downloaded));
        assert_eq!(summary.outcomes[4], (idx(5), Outcome::Downloaded));
        assert_eq!(summary.successful(), vec![1, 2, 4, 5]);
        assert_eq!(summary.failed(), vec![3]);
        assert!(!summary.interrupted);
    }

    #[test]
    fn interrupt_stops_the_batch_after_current_index() {
        let dir = tempfile::tempdir().expect("temp dir");
        let fetcher = FakeFetcher::new(Produces::Combined).with(2, Produces::Interrupt);

        let (summary, _) = run_batch(dir.path(), &fetcher, Vec::new(), &range(1, 4));

        assert!(summary.interrupted);
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(fetcher.call_count(), 2);
        assert!(summary.render().contains("Interrupted"));
    }

    #[test]
    fn rerun_after_interrupt_matches_uninterrupted_run() {
        let interrupted_dir = tempfile::tempdir().expect("temp dir");
        let first = FakeFetcher::new(Produces::Split).with(3, Produces::Interrupt);
        let (summary, _) = run_batch(interrupted_dir.path(), &first, Vec::new(), &range(1, 4));
        assert!(summary.interrupted);

        let second = FakeFetcher::new(Produces::Split);
        let (summary, resolver) =
            run_batch(interrupted_dir.path(), &second, Vec::new(), &range(1, 4));
        assert_eq!(summary.skipped(), vec![1, 2]);
        assert_eq!(summary.successful(), vec![3, 4]);
        assert_eq!(resolver.calls, vec![idx(3), idx(4)]);

        let clean_dir = tempfile::tempdir().expect("temp dir");
        let clean = FakeFetcher::new(Produces::Split);
        run_batch(clean_dir.path(), &clean, Vec::new(), &range(1, 4));

        assert_eq!(
            file_names(interrupted_dir.path()),
            file_names(clean_dir.path())
        );
        assert_eq!(
            file_names(clean_dir.path()),
            vec![
                "Recording_01.mp4",
                "Recording_02.mp4",
                "Recording_03.mp4",
                "Recording_04.mp4"
            ]
        );
    }

    #[test]
    fn render_lists_indices_per_group() {
        let summary = Summary {
            outcomes: vec![
                (idx(1), Outcome::Skipped),
                (idx(2), Outcome::Merged),
                (idx(3), Outcome::MergeFailed("boom".to_string())),
            ],
            interrupted: false,
        };
        let rendered = summary.render();
        assert!(rendered.contains("Successful: 1 videos\n    [2]\n"));
        assert!(rendered.contains("Skipped:    1 videos (already downloaded)\n    [1]\n"));
        assert!(rendered.contains("Failed:     1 videos\n    [3]\n"));
        assert!(rendered.contains("--merge"));
    }
}
