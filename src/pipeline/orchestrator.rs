use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, error, info, warn};

use crate::dataset::{
    ComplexityMeasurement, CoverageMeasurement, Dataset, Project, Revision, RevisionRecord,
    StageDiagnostic,
};
use crate::defects4j::{discover_revisions, extract_coverage, Toolkit};
use crate::error::{HarvestError, Result};
use crate::output::{print_stages_header, StageProgress};
use crate::process::CommandOutcome;
use crate::sonar::{ComplexityExtractor, MeasuresSource, Scan, SonarClient, SonarScanner};
use crate::workspace::WorkRoot;

use super::policy::{Decision, FailurePolicy, Stage};

/// Linear run states; a run only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    ValidateProject,
    Discover,
    ValidateToolInstallation,
    Checkout,
    VerifyWorkspaces,
    Coverage,
    Compile,
    Complexity,
    TestDelay,
    Assemble,
    Completed,
    Aborted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::ValidateProject => "validate project",
            PipelineState::Discover => "discover revisions",
            PipelineState::ValidateToolInstallation => "validate toolkit",
            PipelineState::Checkout => "checkout",
            PipelineState::VerifyWorkspaces => "verify workspaces",
            PipelineState::Coverage => "coverage",
            PipelineState::Compile => "compile",
            PipelineState::Complexity => "complexity",
            PipelineState::TestDelay => "test delays",
            PipelineState::Assemble => "assemble",
            PipelineState::Completed => "completed",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub policy: FailurePolicy,
    /// Project the toolkit self-check asks about
    pub reference_project: String,
    pub collect_test_delays: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            reference_project: "Lang".to_string(),
            collect_test_delays: true,
        }
    }
}

/// Sequences every stage over every revision of one project.
///
/// Each stage runs for all revisions before the next stage starts. The
/// revision list is computed once by discovery and handed to every stage.
pub struct Pipeline<S = SonarScanner, M = SonarClient> {
    toolkit: Toolkit,
    work_root: WorkRoot,
    complexity: ComplexityExtractor<S, M>,
    options: PipelineOptions,
}

fn transition(state: PipelineState) {
    info!("Pipeline state: {state}");
}

impl<S: Scan, M: MeasuresSource> Pipeline<S, M> {
    pub fn new(
        toolkit: Toolkit,
        work_root: WorkRoot,
        complexity: ComplexityExtractor<S, M>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            toolkit,
            work_root,
            complexity,
            options,
        }
    }

    /// Runs the whole pipeline for `project`.
    ///
    /// Returns the assembled dataset, or the error that aborted the run.
    pub async fn run(&self, project: &str) -> Result<Dataset> {
        let result = self.execute(project).await;
        match &result {
            Ok(dataset) => {
                transition(PipelineState::Completed);
                info!("Collected {} complete revision records", dataset.len());
            }
            Err(e) => {
                error!("{e}");
                transition(PipelineState::Aborted);
            }
        }
        result
    }

    async fn execute(&self, project: &str) -> Result<Dataset> {
        transition(PipelineState::ValidateProject);
        let project: Project = project.parse().inspect_err(|_| {
            error!("{project} is not a supported project");
            error!("Supported projects: {:?}", Project::supported());
        })?;

        transition(PipelineState::Discover);
        let revisions = discover_revisions(self.toolkit.bin_dir(), project)?;
        debug!("Revisions: {revisions:?}");

        transition(PipelineState::ValidateToolInstallation);
        self.toolkit
            .verify_installation(&self.options.reference_project)
            .await?;

        print_stages_header();
        let mut diagnostics = Vec::new();

        transition(PipelineState::Checkout);
        let revisions = self
            .checkout_all(project, &revisions, &mut diagnostics)
            .await?;

        transition(PipelineState::VerifyWorkspaces);
        self.verify_workspaces(&revisions)?;

        transition(PipelineState::Coverage);
        let coverages = self.coverage_all(&revisions).await?;

        transition(PipelineState::Compile);
        self.compile_all(&revisions, &mut diagnostics).await?;

        transition(PipelineState::Complexity);
        let complexities = self.complexity_all(project, &revisions).await?;

        let delays = if self.options.collect_test_delays {
            transition(PipelineState::TestDelay);
            Some(self.test_delays_all(&revisions, &mut diagnostics).await?)
        } else {
            None
        };

        transition(PipelineState::Assemble);
        assemble(
            project,
            &revisions,
            coverages,
            complexities,
            delays,
            diagnostics,
        )
    }

    /// Applies the failure policy to a finished tool invocation.
    fn settle(
        &self,
        stage: Stage,
        revision: &Revision,
        outcome: &CommandOutcome,
        diagnostics: &mut Vec<StageDiagnostic>,
    ) -> Result<()> {
        debug!("{stage} output for revision {revision}:\n{}", outcome.output);
        if outcome.success {
            return Ok(());
        }

        match self.options.policy.decide(stage) {
            Decision::Abort => Err(HarvestError::StageFailed {
                stage: stage.to_string(),
                revision: revision.to_string(),
                diagnostic: outcome.tail(20),
            }),
            Decision::Continue => {
                warn!(
                    "{stage} failed for revision {revision} (exit {:?}), continuing",
                    outcome.exit_code
                );
                diagnostics.push(StageDiagnostic {
                    revision: revision.clone(),
                    stage: stage.to_string(),
                    exit_code: outcome.exit_code,
                    output: outcome.tail(20),
                });
                Ok(())
            }
        }
    }

    /// Checks out every revision and returns the ones that succeeded.
    ///
    /// A tolerated checkout failure drops the revision from every later
    /// stage; its diagnostic stays in the dataset.
    async fn checkout_all(
        &self,
        project: Project,
        revisions: &[Revision],
        diagnostics: &mut Vec<StageDiagnostic>,
    ) -> Result<Vec<Revision>> {
        let progress = StageProgress::start(
            format!("Checking out all versions of {project}"),
            revisions.len(),
        );
        let mut checked_out = Vec::with_capacity(revisions.len());

        for revision in revisions {
            let dest = self.work_root.workspace(revision);
            let outcome = match self.toolkit.checkout(project, revision, &dest).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };
            if let Err(e) = self.settle(Stage::Checkout, revision, &outcome, diagnostics) {
                progress.abandon();
                return Err(e);
            }
            if outcome.success {
                checked_out.push(revision.clone());
            }
            progress.advance();
        }

        progress.finish();
        if checked_out.len() < revisions.len() {
            warn!(
                "Skipping {} revision(s) whose checkout failed",
                revisions.len() - checked_out.len()
            );
        }
        info!("Done checking out all versions");
        Ok(checked_out)
    }

    /// Reports checkouts that disappeared or appeared behind the run's back.
    fn verify_workspaces(&self, revisions: &[Revision]) -> Result<()> {
        let drift = self.work_root.drift(revisions)?;
        if drift.is_clean() {
            return Ok(());
        }

        if !drift.extra.is_empty() {
            warn!(
                "Ignoring checkouts not discovered for this run: {:?}",
                drift.extra
            );
        }

        if drift.missing.is_empty() {
            return Ok(());
        }

        Err(HarvestError::WorkspaceDrift {
            root: self.work_root.path().display().to_string(),
            missing: drift.missing.iter().map(ToString::to_string).collect(),
            extra: drift.extra.iter().map(ToString::to_string).collect(),
        })
    }

    async fn coverage_all(
        &self,
        revisions: &[Revision],
    ) -> Result<HashMap<Revision, CoverageMeasurement>> {
        let progress = StageProgress::start("Calculating coverages", revisions.len());
        let mut coverages = HashMap::new();

        for revision in revisions {
            let workspace = self.work_root.workspace(revision);
            let measured = self
                .toolkit
                .coverage(&workspace)
                .await
                .and_then(|outcome| {
                    debug!("coverage output for revision {revision}:\n{}", outcome.output);
                    extract_coverage(revision, &outcome.output)
                });

            match measured {
                Ok(coverage) => {
                    coverages.insert(revision.clone(), coverage);
                    progress.advance();
                }
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }
        }

        progress.finish();
        info!("Coverages: {coverages:?}");
        Ok(coverages)
    }

    async fn compile_all(
        &self,
        revisions: &[Revision],
        diagnostics: &mut Vec<StageDiagnostic>,
    ) -> Result<()> {
        let progress = StageProgress::start("Compiling versions", revisions.len());
        for revision in revisions {
            let workspace = self.work_root.workspace(revision);
            let settled = match self.toolkit.compile(&workspace).await {
                Ok(outcome) => self.settle(Stage::Compile, revision, &outcome, diagnostics),
                Err(e) => Err(e),
            };
            if let Err(e) = settled {
                progress.abandon();
                return Err(e);
            }
            progress.advance();
        }
        progress.finish();
        info!("Completed compilation of all versions");
        Ok(())
    }

    async fn complexity_all(
        &self,
        project: Project,
        revisions: &[Revision],
    ) -> Result<HashMap<Revision, ComplexityMeasurement>> {
        let progress = StageProgress::start(
            "Calculating cyclomatic complexities",
            revisions.len(),
        );
        let mut complexities = HashMap::new();

        for revision in revisions {
            let workspace = self.work_root.workspace(revision);
            match self.complexity.measure(project, revision, &workspace).await {
                Ok(measured) => {
                    complexities.insert(revision.clone(), measured);
                    progress.advance();
                }
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }
        }

        progress.finish();
        info!("Completed scanning versions");
        Ok(complexities)
    }

    async fn test_delays_all(
        &self,
        revisions: &[Revision],
        diagnostics: &mut Vec<StageDiagnostic>,
    ) -> Result<HashMap<Revision, f64>> {
        let progress = StageProgress::start("Getting testing delays", revisions.len());
        let mut delays = HashMap::new();

        for revision in revisions {
            let workspace = self.work_root.workspace(revision);
            let timed = match self.toolkit.test(&workspace).await {
                Ok(outcome) => self
                    .settle(Stage::TestDelay, revision, &outcome, diagnostics)
                    .map(|()| outcome.elapsed.as_secs_f64()),
                Err(e) => Err(e),
            };
            match timed {
                Ok(secs) => {
                    delays.insert(revision.clone(), secs);
                    progress.advance();
                }
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }
        }

        progress.finish();
        info!("Completed delay calculation");
        Ok(delays)
    }
}

/// Joins the per-stage results into complete per-revision records.
fn assemble(
    project: Project,
    revisions: &[Revision],
    mut coverages: HashMap<Revision, CoverageMeasurement>,
    mut complexities: HashMap<Revision, ComplexityMeasurement>,
    mut delays: Option<HashMap<Revision, f64>>,
    diagnostics: Vec<StageDiagnostic>,
) -> Result<Dataset> {
    let incomplete = |revision: &Revision, measurement| HarvestError::IncompleteRecord {
        revision: revision.to_string(),
        measurement,
    };

    let mut records = IndexMap::with_capacity(revisions.len());
    for revision in revisions {
        let coverage = coverages
            .remove(revision)
            .ok_or_else(|| incomplete(revision, "coverage"))?;
        let complexity = complexities
            .remove(revision)
            .ok_or_else(|| incomplete(revision, "complexity"))?;
        let test_delay_secs = match delays.as_mut() {
            Some(delays) => Some(
                delays
                    .remove(revision)
                    .ok_or_else(|| incomplete(revision, "test delay"))?,
            ),
            None => None,
        };

        records.insert(
            revision.clone(),
            RevisionRecord {
                coverage,
                complexity,
                test_delay_secs,
            },
        );
    }

    Ok(Dataset {
        project,
        collected_at: Utc::now(),
        revisions: records,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ServerAuth, Token};
    use crate::pipeline::OnFailure;
    use crate::sonar::ProjectKey;
    use mockito::Matcher;
    use std::time::Duration;

    fn revs(ids: &[&str]) -> Vec<Revision> {
        ids.iter().map(|id| Revision::new(*id)).collect()
    }

    fn coverage(line: f64) -> CoverageMeasurement {
        CoverageMeasurement {
            line_coverage_percent: line,
            condition_coverage_percent: line / 2.0,
        }
    }

    #[test]
    fn test_assemble_orders_records_by_canonical_list() {
        let revisions = revs(&["1", "2", "10"]);
        let coverages = revisions
            .iter()
            .map(|r| (r.clone(), coverage(50.0)))
            .collect();
        let complexities = revisions
            .iter()
            .map(|r| (r.clone(), ComplexityMeasurement { complexity: 3.0 }))
            .collect();

        let dataset = assemble(
            Project::Csv,
            &revisions,
            coverages,
            complexities,
            None,
            vec![],
        )
        .unwrap();

        let keys: Vec<&str> = dataset.revisions.keys().map(Revision::as_str).collect();
        assert_eq!(keys, vec!["1", "2", "10"]);
        assert!(!dataset.collects_test_delays());
    }

    #[test]
    fn test_assemble_rejects_partial_records() {
        let revisions = revs(&["1", "2"]);
        let coverages = revisions
            .iter()
            .map(|r| (r.clone(), coverage(50.0)))
            .collect();
        let mut complexities = HashMap::new();
        complexities.insert(Revision::new("1"), ComplexityMeasurement { complexity: 3.0 });

        let result = assemble(
            Project::Csv,
            &revisions,
            coverages,
            complexities,
            None,
            vec![],
        );

        assert!(matches!(
            result,
            Err(HarvestError::IncompleteRecord { ref revision, measurement: "complexity" })
                if revision == "2"
        ));
    }

    #[test]
    fn test_assemble_requires_delays_when_collected() {
        let revisions = revs(&["1"]);
        let coverages = revisions
            .iter()
            .map(|r| (r.clone(), coverage(50.0)))
            .collect();
        let complexities = revisions
            .iter()
            .map(|r| (r.clone(), ComplexityMeasurement { complexity: 3.0 }))
            .collect();

        let result = assemble(
            Project::Csv,
            &revisions,
            coverages,
            complexities,
            Some(HashMap::new()),
            vec![],
        );
        assert!(matches!(
            result,
            Err(HarvestError::IncompleteRecord { measurement: "test delay", .. })
        ));
    }

    #[cfg(unix)]
    mod end_to_end {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};
        use tempfile::TempDir;

        const COVERAGE_TEXT: &str = "Lines total: 100 Lines covered: 80 Conditions total: 20 Conditions covered: 10 Line coverage: 80.0% Condition coverage: 50.0%";

        /// Behaviour knobs for the fake toolkit script.
        struct FakeTool {
            info_exit: i32,
            compile_exit: i32,
            coverage_text: &'static str,
            skip_checkout_of: Option<&'static str>,
            fail_checkout_of: Option<&'static str>,
        }

        impl Default for FakeTool {
            fn default() -> Self {
                Self {
                    info_exit: 0,
                    compile_exit: 0,
                    coverage_text: COVERAGE_TEXT,
                    skip_checkout_of: None,
                    fail_checkout_of: None,
                }
            }
        }

        struct Fixture {
            _root: TempDir,
            bin: PathBuf,
            scanner: PathBuf,
            work: PathBuf,
            log: PathBuf,
        }

        impl Fixture {
            fn calls(&self) -> Vec<String> {
                fs::read_to_string(&self.log)
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_string)
                    .collect()
            }

            fn pipeline(&self, server_url: &str, options: PipelineOptions) -> Pipeline {
                let complexity = ComplexityExtractor::new(
                    SonarScanner::new(&self.scanner, server_url, Token::from("sqp_project")),
                    SonarClient::new(server_url, ServerAuth::Bearer(Token::from("squ_user")))
                        .unwrap(),
                    ProjectKey::PerRevision,
                    Duration::ZERO,
                );
                Pipeline::new(
                    Toolkit::new(&self.bin),
                    WorkRoot::new(&self.work, "345"),
                    complexity,
                    options,
                )
            }
        }

        fn write_script(path: &Path, body: &str) {
            fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn fixture(bugs: &[&str], tool: FakeTool) -> Fixture {
            let root = TempDir::new().unwrap();
            let log = root.path().join("calls.log");
            let bin = root.path().join("defects4j/framework/bin");
            fs::create_dir_all(&bin).unwrap();

            let triggers = root
                .path()
                .join("defects4j/framework/projects/Csv/trigger_tests");
            fs::create_dir_all(&triggers).unwrap();
            for bug in bugs {
                fs::write(triggers.join(bug), "--- org.apache.commons.csv.CSVLexerTest").unwrap();
            }

            let skip = tool.skip_checkout_of.unwrap_or("");
            let fail = tool.fail_checkout_of.unwrap_or("");
            write_script(
                &bin.join("defects4j"),
                &format!(
                    r#"here=$(basename "$(pwd -P)")
case "$1" in
  info) echo "info $3" >> "{log}"; exit {info_exit} ;;
  checkout)
    echo "checkout $5" >> "{log}"
    if [ "$5" = "{fail}b" ]; then echo "Check out program version: $3-$5 .... FAIL"; exit 1; fi
    if [ "$5" != "{skip}b" ]; then mkdir -p "$7"; fi
    echo "Check out program version: $3-$5 .... OK" ;;
  coverage) echo "coverage $here" >> "{log}"; echo "{coverage}" ;;
  compile) echo "compile $here" >> "{log}"; echo "Running ant (compile)"; exit {compile_exit} ;;
  test) echo "test $here" >> "{log}"; echo "Failing tests: 0" ;;
  *) exit 1 ;;
esac
"#,
                    log = log.display(),
                    info_exit = tool.info_exit,
                    compile_exit = tool.compile_exit,
                    coverage = tool.coverage_text,
                ),
            );

            let scanner_bin = root.path().join("sonar-scanner/bin");
            fs::create_dir_all(&scanner_bin).unwrap();
            write_script(
                &scanner_bin.join("sonar-scanner"),
                &format!(
                    "echo \"scan $(basename \"$(pwd -P)\") $1\" >> \"{}\"\necho \"INFO: EXECUTION SUCCESS\"\n",
                    log.display()
                ),
            );

            Fixture {
                bin,
                scanner: scanner_bin,
                work: root.path().join("work"),
                log,
                _root: root,
            }
        }

        async fn mock_measure(
            server: &mut mockito::ServerGuard,
            key: &str,
            status: usize,
            value: &str,
        ) -> mockito::Mock {
            server
                .mock("GET", "/api/measures/component")
                .match_query(Matcher::UrlEncoded("component".into(), key.into()))
                .match_header("authorization", "Bearer squ_user")
                .with_status(status)
                .with_body(format!(
                    r#"{{"component":{{"key":"{key}","measures":[{{"metric":"complexity","value":"{value}"}}]}}}}"#
                ))
                .create_async()
                .await
        }

        #[tokio::test]
        async fn test_full_run_collects_every_revision() {
            let fx = fixture(&["1", "2", "3"], FakeTool::default());
            let mut server = mockito::Server::new_async().await;
            let m1 = mock_measure(&mut server, "Csv-1", 200, "120").await;
            let m2 = mock_measure(&mut server, "Csv-2", 200, "125").await;
            let m3 = mock_measure(&mut server, "Csv-3", 200, "131").await;

            let dataset = fx
                .pipeline(&server.url(), PipelineOptions::default())
                .run("Csv")
                .await
                .unwrap();

            for id in ["1", "2", "3"] {
                assert!(fx.work.join("345").join(id).is_dir());
            }

            let first = &dataset.revisions[&Revision::new("1")];
            assert_eq!(first.coverage.line_coverage_percent, 80.0);
            assert_eq!(first.coverage.condition_coverage_percent, 50.0);
            assert_eq!(first.complexity.complexity, 120.0);
            assert!(first.test_delay_secs.is_some());
            assert_eq!(
                dataset.revisions[&Revision::new("3")].complexity.complexity,
                131.0
            );
            assert!(dataset.diagnostics.is_empty());

            // Each stage finishes for every revision before the next begins.
            assert_eq!(
                fx.calls(),
                vec![
                    "info Lang",
                    "checkout 1b",
                    "checkout 2b",
                    "checkout 3b",
                    "coverage 1",
                    "coverage 2",
                    "coverage 3",
                    "compile 1",
                    "compile 2",
                    "compile 3",
                    "scan 1 -Dsonar.projectKey=Csv-1",
                    "scan 2 -Dsonar.projectKey=Csv-2",
                    "scan 3 -Dsonar.projectKey=Csv-3",
                    "test 1",
                    "test 2",
                    "test 3",
                ]
            );

            m1.assert_async().await;
            m2.assert_async().await;
            m3.assert_async().await;
        }

        #[tokio::test]
        async fn test_server_error_aborts_before_later_revisions() {
            let fx = fixture(&["1", "2", "3"], FakeTool::default());
            let mut server = mockito::Server::new_async().await;
            let _m1 = mock_measure(&mut server, "Csv-1", 200, "120").await;
            let _m2 = mock_measure(&mut server, "Csv-2", 404, "0").await;
            let m3 = server
                .mock("GET", "/api/measures/component")
                .match_query(Matcher::UrlEncoded("component".into(), "Csv-3".into()))
                .expect(0)
                .create_async()
                .await;

            let result = fx
                .pipeline(&server.url(), PipelineOptions::default())
                .run("Csv")
                .await;

            assert!(matches!(result, Err(HarvestError::Api { status: 404, .. })));
            let calls = fx.calls();
            assert!(calls.contains(&"scan 2 -Dsonar.projectKey=Csv-2".to_string()));
            assert!(!calls.iter().any(|c| c.starts_with("scan 3")));
            assert!(!calls.iter().any(|c| c.starts_with("test")));
            m3.assert_async().await;
        }

        #[tokio::test]
        async fn test_unsupported_project_has_no_side_effects() {
            let fx = fixture(&["1"], FakeTool::default());

            let result = fx
                .pipeline("http://127.0.0.1:9", PipelineOptions::default())
                .run("Lang")
                .await;

            assert!(matches!(result, Err(HarvestError::UnsupportedProject { .. })));
            assert!(fx.calls().is_empty());
            assert!(!fx.work.exists());
        }

        #[tokio::test]
        async fn test_failed_self_check_stops_before_checkout() {
            let tool = FakeTool {
                info_exit: 1,
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2"], tool);

            let result = fx
                .pipeline("http://127.0.0.1:9", PipelineOptions::default())
                .run("Csv")
                .await;

            assert!(matches!(result, Err(HarvestError::ToolInstallation(_))));
            assert_eq!(fx.calls(), vec!["info Lang"]);
        }

        #[tokio::test]
        async fn test_coverage_mismatch_aborts_run() {
            let tool = FakeTool {
                coverage_text: "BUILD FAILED",
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2"], tool);

            let result = fx
                .pipeline("http://127.0.0.1:9", PipelineOptions::default())
                .run("Csv")
                .await;

            assert!(matches!(
                result,
                Err(HarvestError::CoverageMismatch { ref revision }) if revision == "1"
            ));
            let calls = fx.calls();
            assert!(!calls.contains(&"coverage 2".to_string()));
            assert!(!calls.iter().any(|c| c.starts_with("compile")));
        }

        #[tokio::test]
        async fn test_compile_failure_is_recorded_and_run_continues() {
            let tool = FakeTool {
                compile_exit: 1,
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2"], tool);
            let mut server = mockito::Server::new_async().await;
            let _m1 = mock_measure(&mut server, "Csv-1", 200, "10").await;
            let _m2 = mock_measure(&mut server, "Csv-2", 200, "11").await;

            let options = PipelineOptions {
                collect_test_delays: false,
                ..PipelineOptions::default()
            };
            let dataset = fx.pipeline(&server.url(), options).run("Csv").await.unwrap();

            assert_eq!(dataset.len(), 2);
            assert_eq!(dataset.diagnostics.len(), 2);
            assert!(dataset
                .diagnostics
                .iter()
                .all(|d| d.stage == "compile" && d.exit_code == Some(1)));
            assert!(!dataset.collects_test_delays());
        }

        #[tokio::test]
        async fn test_compile_failure_aborts_under_strict_policy() {
            let tool = FakeTool {
                compile_exit: 1,
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2"], tool);
            let options = PipelineOptions {
                policy: FailurePolicy {
                    compile: OnFailure::Abort,
                    ..FailurePolicy::default()
                },
                ..PipelineOptions::default()
            };

            let result = fx.pipeline("http://127.0.0.1:9", options).run("Csv").await;

            assert!(matches!(
                result,
                Err(HarvestError::StageFailed { ref stage, ref revision, .. })
                    if stage == "compile" && revision == "1"
            ));
            assert!(!fx.calls().iter().any(|c| c.starts_with("scan")));
        }

        #[tokio::test]
        async fn test_extra_checkout_directory_is_ignored() {
            let fx = fixture(&["1", "2"], FakeTool::default());
            fs::create_dir_all(fx.work.join("345").join("99")).unwrap();
            let mut server = mockito::Server::new_async().await;
            let _m1 = mock_measure(&mut server, "Csv-1", 200, "10").await;
            let _m2 = mock_measure(&mut server, "Csv-2", 200, "11").await;

            let dataset = fx
                .pipeline(&server.url(), PipelineOptions::default())
                .run("Csv")
                .await
                .unwrap();

            let keys: Vec<&str> = dataset.revisions.keys().map(Revision::as_str).collect();
            assert_eq!(keys, vec!["1", "2"]);
            assert!(!fx.calls().contains(&"coverage 99".to_string()));
        }

        #[tokio::test]
        async fn test_tolerated_checkout_failure_drops_revision() {
            let tool = FakeTool {
                fail_checkout_of: Some("2"),
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2", "3"], tool);
            let mut server = mockito::Server::new_async().await;
            let _m1 = mock_measure(&mut server, "Csv-1", 200, "10").await;
            let _m3 = mock_measure(&mut server, "Csv-3", 200, "13").await;
            let options = PipelineOptions {
                policy: FailurePolicy {
                    checkout: OnFailure::Continue,
                    ..FailurePolicy::default()
                },
                ..PipelineOptions::default()
            };

            let dataset = fx.pipeline(&server.url(), options).run("Csv").await.unwrap();

            let keys: Vec<&str> = dataset.revisions.keys().map(Revision::as_str).collect();
            assert_eq!(keys, vec!["1", "3"]);
            assert_eq!(dataset.diagnostics.len(), 1);
            let diagnostic = &dataset.diagnostics[0];
            assert_eq!(diagnostic.revision, Revision::new("2"));
            assert_eq!(diagnostic.stage, "checkout");
            assert_eq!(diagnostic.exit_code, Some(1));

            let calls = fx.calls();
            assert!(calls.contains(&"checkout 3b".to_string()));
            assert!(!calls.iter().any(|c| c == "coverage 2" || c.starts_with("scan 2")));
        }

        #[tokio::test]
        async fn test_checkout_failure_aborts_by_default() {
            let tool = FakeTool {
                fail_checkout_of: Some("2"),
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2", "3"], tool);

            let result = fx
                .pipeline("http://127.0.0.1:9", PipelineOptions::default())
                .run("Csv")
                .await;

            assert!(matches!(
                result,
                Err(HarvestError::StageFailed { ref stage, ref revision, .. })
                    if stage == "checkout" && revision == "2"
            ));
            assert!(!fx.calls().contains(&"checkout 3b".to_string()));
        }

        #[tokio::test]
        async fn test_missing_checkout_directory_is_reported() {
            let tool = FakeTool {
                skip_checkout_of: Some("2"),
                ..FakeTool::default()
            };
            let fx = fixture(&["1", "2", "3"], tool);

            let result = fx
                .pipeline("http://127.0.0.1:9", PipelineOptions::default())
                .run("Csv")
                .await;

            match result {
                Err(HarvestError::WorkspaceDrift { missing, extra, .. }) => {
                    assert_eq!(missing, vec!["2"]);
                    assert!(extra.is_empty());
                }
                other => panic!("expected workspace drift, got {other:?}"),
            }
            assert!(!fx.calls().iter().any(|c| c.starts_with("coverage")));
        }
    }
}
