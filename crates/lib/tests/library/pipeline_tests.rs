//! End-to-end job pipeline tests: phase ordering, failure isolation, and
//! mode filtering.

use std::sync::Arc;

use gobuild_lib::config::{Action, Phase, Platform, Project};
use gobuild_lib::schedule::JobError;

use super::common::{RecordingToolchain, Workspace, order, run};

fn record(step: &str, on: Phase) -> Action {
  Action::new("exec", format!("sh ./record.sh {step}"), on)
}

fn host_platform(actions: Vec<Action>) -> Platform {
  Platform {
    output: "bin/${PKGNAME}".to_string(),
    actions,
    ..Default::default()
  }
}

#[cfg(unix)]
mod ordering {
  use super::*;

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn phases_run_in_declared_order() {
    let ws = Workspace::new();
    let dir = ws.main_package("server");
    let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
    // Declaration order interleaves phases; execution groups them
    let actions = vec![
      record("A", Phase::Before),
      record("C", Phase::After),
      record("B", Phase::Before),
      record("D", Phase::After),
    ];
    let projects = vec![Project::new("server", vec![host_platform(actions)]).with_full_path(&dir)];

    let (results, summary) = run(toolchain, &projects, None).await;

    assert!(summary.is_success(), "{:?}", results[0].error);
    assert_eq!(order(&dir), vec!["A", "B", "build", "C", "D"]);
    assert!(dir.join("bin/server").exists());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn before_failure_stops_the_job() {
    let ws = Workspace::new();
    let dir = ws.main_package("server");
    let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
    let actions = vec![
      record("A", Phase::Before),
      record("B fail", Phase::Before),
      record("C", Phase::After),
      record("D", Phase::After),
    ];
    let projects = vec![Project::new("server", vec![host_platform(actions)]).with_full_path(&dir)];

    let (results, summary) = run(toolchain.clone(), &projects, None).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(order(&dir), vec!["A", "B"]);
    assert!(toolchain.builds().is_empty());
    match &results[0].error {
      Some(JobError::Action(e)) => {
        assert_eq!(e.phase, Phase::Before);
        assert_eq!(e.index, 1);
        assert!(e.to_string().contains("record.sh B fail"));
      }
      other => panic!("expected action failure, got {other:?}"),
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn after_failure_keeps_earlier_side_effects() {
    let ws = Workspace::new();
    let dir = ws.main_package("server");
    let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
    let actions = vec![
      record("C", Phase::After),
      record("D fail", Phase::After),
      record("E", Phase::After),
    ];
    let projects = vec![Project::new("server", vec![host_platform(actions)]).with_full_path(&dir)];

    let (results, _) = run(toolchain, &projects, None).await;

    assert!(matches!(&results[0].error, Some(JobError::Action(e)) if e.phase == Phase::After));
    assert_eq!(order(&dir), vec!["build", "C", "D"]);
    assert!(results[0].output.starts_with("go build -o"));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn publish_actions_only_run_in_publish_mode() {
    let ws = Workspace::new();
    let dir = ws.main_package("server");
    let actions = vec![
      record("always", Phase::After),
      record("publish", Phase::After).with_mode("publish"),
    ];
    let projects = vec![Project::new("server", vec![host_platform(actions)]).with_full_path(&dir)];

    for mode in [Some("test"), None] {
      std::fs::remove_file(dir.join("order.log")).ok();
      let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
      let (_, summary) = run(toolchain, &projects, mode).await;
      assert!(summary.is_success());
      assert_eq!(order(&dir), vec!["build", "always"], "mode {mode:?}");
    }

    std::fs::remove_file(dir.join("order.log")).unwrap();
    let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
    run(toolchain, &projects, Some("publish")).await;
    assert_eq!(order(&dir), vec!["build", "always", "publish"]);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn exec_arguments_are_expanded_per_job() {
    let ws = Workspace::new();
    let dir = ws.main_package("server");
    let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
    let platforms = ["linux", "windows"]
      .into_iter()
      .map(|os| Platform {
        os: os.to_string(),
        arch: "amd64".to_string(),
        output: "bin/${GOOS}/${PKGNAME}".to_string(),
        actions: vec![record("${OUTPUTDIR}:${OUTPUTNAME}", Phase::After)],
        ..Default::default()
      })
      .collect();
    let projects = vec![Project::new("server", platforms).with_full_path(&dir)];

    let (_, summary) = run(toolchain, &projects, None).await;

    assert!(summary.is_success());
    let mut lines: Vec<String> = order(&dir).into_iter().filter(|l| l != "build").collect();
    lines.sort();
    assert_eq!(lines, vec!["bin/linux:server", "bin/windows:server"]);
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresolvable_project_skips_build_and_actions() {
  let ws = Workspace::new();
  let good = ws.main_package("server");
  let bad = ws.root().join("lib");
  std::fs::create_dir_all(&bad).unwrap();
  ws.write_file("lib/config/app.conf", "x");
  let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
  let copy = Action::new("copy", "config/*.conf out", Phase::Before);
  let projects = vec![
    Project::new("lib", vec![host_platform(vec![copy])]).with_full_path(&bad),
    Project::new("server", vec![host_platform(vec![])]).with_full_path(&good),
  ];

  let (results, summary) = run(toolchain.clone(), &projects, None).await;

  assert_eq!(summary.total, 2);
  assert_eq!(summary.failed, 1);
  let failed = results.iter().find(|r| !r.is_success()).unwrap();
  assert_eq!(failed.package, "lib");
  assert!(matches!(failed.error, Some(JobError::Resolve(_))));
  assert!(!bad.join("out").exists());
  assert_eq!(toolchain.builds(), vec!["example.com/server linux/amd64"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rerun_gives_identical_status() {
  let ws = Workspace::new();
  let good = ws.main_package("server");
  let bad = ws.root().join("lib");
  std::fs::create_dir_all(&bad).unwrap();
  ws.write_file("server/config/app.conf", "port=80");
  let copy = Action::new("copy", "config/*.conf ${OUTPUTDIR}/config", Phase::After);
  let projects = vec![
    Project::new("server", vec![host_platform(vec![copy])]).with_full_path(&good),
    Project::new("lib", vec![host_platform(vec![])]).with_full_path(&bad),
  ];

  let mut statuses = Vec::new();
  for _ in 0..2 {
    std::fs::remove_dir_all(good.join("bin")).ok();
    let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
    let (mut results, summary) = run(toolchain, &projects, None).await;
    results.sort_by(|a, b| a.package.cmp(&b.package));
    let status: Vec<(String, bool)> = results.iter().map(|r| (r.package.clone(), r.is_success())).collect();
    statuses.push((status, summary));
  }

  assert_eq!(statuses[0], statuses[1]);
  assert!(good.join("bin/config/app.conf").exists());
}

#[tokio::test]
async fn host_filtered_platforms_produce_no_result() {
  let ws = Workspace::new();
  let dir = ws.main_package("server");
  let toolchain = Arc::new(RecordingToolchain::new(&ws.gopath()));
  let platforms = vec![
    host_platform(vec![]),
    Platform {
      os: "windows".to_string(),
      arch: "amd64".to_string(),
      on: Some("windows".to_string()),
      ..Default::default()
    },
  ];
  let projects = vec![Project::new("server", platforms).with_full_path(&dir)];

  let (results, summary) = run(toolchain, &projects, None).await;

  assert_eq!(results.len(), 1);
  assert_eq!(summary.total, 1);
  assert_eq!(results[0].platform(), "linux/amd64");
}
