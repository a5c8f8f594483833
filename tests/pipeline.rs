//! End-to-end runs against the in-memory API.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use uptime_archive::orchestrator::Clock;
use uptime_archive::{
    IdSelection, MemoryApi, Monitor, Orchestrator, Probe, ResultRecord, RunOptions, Window,
    WINDOW_SPAN,
};

const NOW: i64 = 2 * WINDOW_SPAN;

fn clock() -> Clock {
    Arc::new(|| NOW)
}

fn record(time: i64, status: &str, probeid: u64) -> ResultRecord {
    ResultRecord {
        time,
        status: status.to_string(),
        responsetime: 200 + time % 100,
        statusdesc: "OK".to_string(),
        statusdesclong: "OK, \"all good\"".to_string(),
        probeid,
    }
}

fn monitor(id: u64, name: &str) -> Monitor {
    Monitor {
        id,
        name: name.to_string(),
        created: 0,
    }
}

fn probe(id: u64) -> Probe {
    Probe {
        id,
        hostname: format!("s{}.example.com", id),
        ip: "192.0.2.1".to_string(),
        ipv6: String::new(),
        name: "Dallas, TX".to_string(),
        city: "Dallas".to_string(),
        countryiso: "US".to_string(),
        country: "United States".to_string(),
        region: "NA".to_string(),
        active: true,
        deleted: false,
    }
}

fn account() -> MemoryApi {
    let mut api = MemoryApi::new().with_probe(probe(1)).with_probe(probe(2));
    for id in 1..=12 {
        api = api
            .with_monitor(monitor(id, &format!("Service #{}", id)))
            .with_results(
                id,
                vec![
                    record(60, "up", 1),
                    record(120, "down", 2),
                    record(WINDOW_SPAN + 60, "up", 1),
                ],
            );
    }
    api
}

fn options(dir: &Path, selection: IdSelection) -> RunOptions {
    RunOptions {
        selection,
        output_dir: dir.to_path_buf(),
        ..RunOptions::default()
    }
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn archives_every_monitor_with_two_windows() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(account());

    let report = Orchestrator::new(api.clone(), options(dir.path(), IdSelection::All))
        .clock(clock())
        .run()
        .await;

    assert_eq!(report.selected, 12);
    assert_eq!(report.written(), 12);
    assert_eq!(report.panicked, 0);
    assert_eq!(api.checks_calls(), 1);

    for id in 1..=12 {
        assert_eq!(
            api.requested_windows(id),
            vec![
                Window { from: 0, to: WINDOW_SPAN },
                Window { from: WINDOW_SPAN, to: 2 * WINDOW_SPAN },
            ]
        );
        let path = dir.path().join(format!("archive-{}-service-{}.csv", id, id));
        let lines = lines(&path);
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "name,human_time,time,status,responsetime,statusdesc,statusdesclong,probeid"
        );
        assert_eq!(
            lines[1],
            format!(
                "Service #{},1970-01-01 00:01:00,60,up,260,OK,\"OK, \"\"all good\"\"\",1",
                id
            )
        );
    }
}

#[tokio::test]
async fn second_window_failure_keeps_first_window() {
    let dir = TempDir::new().unwrap();
    let api = account().with_window_failure(3, WINDOW_SPAN, 503, "Service unavailable");

    let report = Orchestrator::new(
        Arc::new(api),
        options(dir.path(), IdSelection::Explicit(vec![3, 4])),
    )
    .clock(clock())
    .run()
    .await;

    assert_eq!(report.written(), 1);
    assert_eq!(report.partial(), 1);

    let partial = lines(&dir.path().join("archive-3-service-3.csv"));
    assert_eq!(partial.len(), 3);
    assert!(partial[1].contains(",60,up,"));
    assert!(partial[2].contains(",120,down,"));

    let full = lines(&dir.path().join("archive-4-service-4.csv"));
    assert_eq!(full.len(), 4);
}

#[tokio::test]
async fn reruns_produce_identical_files() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(account());
    let path = dir.path().join("archive-5-service-5.csv");

    let run = || {
        Orchestrator::new(
            api.clone(),
            options(dir.path(), IdSelection::Explicit(vec![5])),
        )
        .clock(clock())
    };

    run().run().await;
    let first = fs::read(&path).unwrap();
    run().run().await;
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_and_filtered_ids_write_nothing() {
    let dir = TempDir::new().unwrap();

    let mut opts = options(dir.path(), IdSelection::Explicit(vec![2, 500, 11, 11]));
    opts.from_id = 10;
    opts.export_probes = true;

    let report = Orchestrator::new(Arc::new(account()), opts)
        .clock(clock())
        .run()
        .await;

    assert_eq!(report.selected, 2);
    assert_eq!(report.written(), 1);
    assert_eq!(report.not_found(), 1);

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["archive-11-service-11.csv", "probes.csv"]);

    let probes = lines(&dir.path().join("probes.csv"));
    assert_eq!(probes.len(), 3);
    assert!(probes[1].starts_with("1,s1.example.com,192.0.2.1,,\"Dallas, TX\",Dallas,US"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_size_does_not_change_results() {
    for workers in [1, 4, 16] {
        let dir = TempDir::new().unwrap();
        let mut opts = options(dir.path(), IdSelection::All);
        opts.workers = workers;
        let api = Arc::new(account());

        let report = Orchestrator::new(api.clone(), opts)
            .clock(clock())
            .run()
            .await;

        assert_eq!(report.written(), 12, "workers = {}", workers);
        let mut ids: Vec<_> = report.outcomes.iter().map(|o| o.monitor_id()).collect();
        ids.sort();
        assert_eq!(ids, (1..=12).collect::<Vec<_>>());
        for id in 1..=12 {
            assert_eq!(api.requested_windows(id).len(), 2);
        }
    }
}
