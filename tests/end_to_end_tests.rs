//! End-to-end tests: source text through compilation to a finished run
//!
//! Each test drives the public driver API the way an embedder would and
//! checks printed output, final state and the run report.

use vectorl::{
    run, Array, CaptureSink, ErrorKind, MemorySources, Origin, RunOptions, RunReport, Simulation,
};

fn run_main(source: &str, options: &RunOptions) -> (RunReport, CaptureSink) {
    let sink = CaptureSink::new();
    let report = run(MemorySources::new().with("main", source), "main", options, sink.clone());
    (report, sink)
}

fn simulate(source: &str) -> (Simulation, CaptureSink) {
    let sink = CaptureSink::new();
    let mut sim = Simulation::compile(MemorySources::new().with("main", source), "main", sink.clone())
        .unwrap_or_else(|d| panic!("compilation failed: {:?}", d.messages()));
    sim.start(None, None).unwrap();
    (sim, sink)
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn test_empty_module_with_only_init() {
    let (report, sink) = run_main("on Init {}", &RunOptions::default());
    assert!(report.success);
    assert_eq!(report.step_count, 1);
    assert_eq!(report.final_now, 0.0);
    assert!(report.messages.is_empty());
    assert!(sink.lines().is_empty());
}

#[test]
fn test_counter() {
    let source = r#"
        var int k = 0;
        event tick();
        on Init emit tick() after 1;
        on tick { k := k+1; if (k<3) emit tick() after 1; }
    "#;
    let sink = CaptureSink::new();
    let mut sim = Simulation::compile(MemorySources::new().with("main", source), "main", sink).unwrap();
    sim.start(Some(100.0), None).unwrap();
    assert_eq!(sim.value("k"), Some(&Array::int(3)));
    assert_eq!(sim.now(), 3.0);
    assert_eq!(sim.step_count(), 4);

    let options = RunOptions {
        until: Some(100.0),
        ..RunOptions::default()
    };
    let (report, _) = run_main(source, &options);
    assert!(report.success);
    assert_eq!(report.final_now, 3.0);
    assert_eq!(report.step_count, 4);
}

#[test]
fn test_broadcast_assignment() {
    let (sim, _) = simulate("var int v = [0,0,0,0];\non Init v := v + [1,2,3,4];");
    assert_eq!(sim.value("v").unwrap().to_i64_vec(), vec![1, 2, 3, 4]);
}

#[test]
fn test_reduction_fold() {
    let (report, sink) = run_main(
        "const int a = sum([[1,2,3],[4,5,6]], 0);\non Init print \"a=\", a;",
        &RunOptions::default(),
    );
    assert!(report.success);
    assert_eq!(sink.lines(), vec!["a= [5 7 9]"]);
}

#[test]
fn test_ordering_under_equal_times() {
    let source = r#"
        event A(); event B();
        on Init { emit B() after 1; emit A() after 1; }
        on A print "A";
        on B print "B";
    "#;
    let (report, sink) = run_main(source, &RunOptions::default());
    assert!(report.success);
    assert_eq!(sink.lines(), vec!["B", "A"]);
}

#[test]
fn test_shape_error_is_caught_at_compile_time() {
    let (report, sink) = run_main("var int v=[1,2];\non Init v := [1,2,3];", &RunOptions::default());
    assert!(!report.success);
    assert_eq!(report.step_count, 0);
    let message = report
        .messages
        .iter()
        .find(|m| m.kind == Some(ErrorKind::ShapeError))
        .expect("a shape error");
    let origin = message.origin.as_ref().unwrap();
    assert_eq!(origin.module, "main");
    assert_eq!(origin.line, 2);
    assert!(sink.lines().is_empty());
}

// =============================================================================
// LANGUAGE FEATURES
// =============================================================================

#[test]
fn test_bounds_leave_events_queued() {
    let source = "event tick(); on Init emit tick() after 1; on tick emit tick() after 2;";
    let options = RunOptions {
        until: Some(6.0),
        ..RunOptions::default()
    };
    let (report, _) = run_main(source, &options);
    assert!(report.success);
    assert_eq!(report.final_now, 5.0);
    assert_eq!(report.step_count, 4);
    assert_eq!(report.pending_events, 1);

    let options = RunOptions {
        steps: Some(2),
        ..RunOptions::default()
    };
    let (report, _) = run_main(source, &options);
    assert_eq!(report.step_count, 2);
    assert_eq!(report.final_now, 1.0);
}

#[test]
fn test_resume_continues_the_run() {
    let source = "var int k = 0; event tick(); on Init emit tick() after 1; on tick { k := k + 1; emit tick() after 1; }";
    let sink = CaptureSink::new();
    let mut sim = Simulation::compile(MemorySources::new().with("main", source), "main", sink).unwrap();
    sim.start(Some(2.0), None).unwrap();
    assert_eq!(sim.value("k"), Some(&Array::int(2)));
    sim.resume(Some(10.0), None).unwrap();
    assert_eq!(sim.value("k"), Some(&Array::int(10)));
    assert_eq!(sim.now(), 10.0);
}

#[test]
fn test_event_parameters_and_now() {
    let source = r#"
        event arrive(int id, real load);
        var real total = 0.0;
        on Init { emit arrive(1, 2.5) after 1; emit arrive(2, 0.5) after 3; }
        on arrive { total := total + load; print "t=", now, id, total; }
    "#;
    let (report, sink) = run_main(source, &RunOptions::default());
    assert!(report.success);
    assert_eq!(sink.lines(), vec!["t= 1.0 1 2.5", "t= 3.0 2 3.0"]);
}

#[test]
fn test_functions_and_local_declarations() {
    let source = r#"
        func real mean(real x) { let real n = (real) shapeof(x)[0]; sum(x, 0) / n }
        var real m = 0.0;
        on Init {
            let int data = [1, 2, 3, 6];
            m := mean(data);
        }
    "#;
    let (sim, _) = simulate(source);
    assert_eq!(sim.value("m"), Some(&Array::real(3.0)));
}

#[test]
fn test_indexing_and_slices() {
    let source = r#"
        var int m = [[1, 2, 3], [4, 5, 6]];
        var int row = [0, 0, 0];
        var int col = [0, 0];
        var int i = 1;
        on Init {
            row := m[i];
            col := m[_, 2];
            m[0, 1:3] := [20, 30];
            m[i, ::2] := 0;
        }
    "#;
    let (sim, _) = simulate(source);
    assert_eq!(sim.value("row").unwrap().to_i64_vec(), vec![4, 5, 6]);
    assert_eq!(sim.value("col").unwrap().to_i64_vec(), vec![3, 6]);
    assert_eq!(sim.value("m").unwrap().to_i64_vec(), vec![1, 20, 30, 0, 5, 0]);
}

#[test]
fn test_sliding_window_with_variable_bounds() {
    let source = r#"
        var int data = [1, 2, 3, 4, 5, 6];
        var int window = [0, 0];
        var int i = 0;
        event step();
        on Init emit step() after 1;
        on step {
            window := data[i : i + 2];
            print window;
            i := i + 2;
            if (i < 6) emit step() after 1;
        }
    "#;
    let (_, sink) = simulate(source);
    assert_eq!(sink.lines(), vec!["[1 2]", "[3 4]", "[5 6]"]);
}

#[test]
fn test_concat_and_conditional() {
    let source = r#"
        var int v = [0, 0, 0, 0];
        var bool big = [false, false, false, false];
        on Init {
            v := [1, 2], [3, 4];
            big := v > 2 ? true : false;
        }
    "#;
    let (sim, _) = simulate(source);
    assert_eq!(sim.value("v").unwrap().to_i64_vec(), vec![1, 2, 3, 4]);
    assert_eq!(sim.value("big").unwrap().to_bool_vec(), vec![false, false, true, true]);
}

#[test]
fn test_builtin_library() {
    let source = r#"
        const int t = transpose([[1, 2, 3], [4, 5, 6]], [1, 0]);
        const int r = range(4);
        const real f = fill([2, 2], 1.5);
        on Init {
            print t;
            print r, maximum(r, 0), minimum(r, -1), product(r + 1, 0);
            print f;
            print floor(2.7), absolute(-3), sign(-2.5), isnan(1.0);
        }
    "#;
    let (report, sink) = run_main(source, &RunOptions::default());
    assert!(report.success, "{:?}", report.messages);
    assert_eq!(
        sink.lines(),
        vec![
            "[[1 4] [2 5] [3 6]]",
            "[0 1 2 3] 3 0 24",
            "[[1.5 1.5] [1.5 1.5]]",
            "2.0 3 -1.0 false",
        ]
    );
}

#[test]
fn test_import_order_drives_action_order() {
    let sources = MemorySources::new()
        .with("main", "import b; import a; on Init print \"main\";")
        .with("a", "on Init print \"a\";")
        .with("b", "import a; on Init print \"b\";");
    let sink = CaptureSink::new();
    let report = run(sources, "main", &RunOptions::default(), sink.clone());
    assert!(report.success);
    // a completes first because b imports it
    assert_eq!(sink.lines(), vec!["a", "b", "main"]);
}

#[test]
fn test_cross_module_events_and_variables() {
    let sources = MemorySources::new()
        .with(
            "main",
            "import q = queue; on Init emit q.push(5) after 1; on q.push print \"pushed\", q.size;",
        )
        .with(
            "queue",
            "var int size = 0; event push(int n); on push size := size + n;",
        );
    let sink = CaptureSink::new();
    let report = run(sources, "main", &RunOptions::default(), sink.clone());
    assert!(report.success, "{:?}", report.messages);
    assert_eq!(sink.lines(), vec!["pushed 5"]);
}

#[test]
fn test_file_sources_search_path() {
    let dir = std::env::temp_dir().join(format!("vectorl-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("model.vl"), "import util; on Init print util.answer;").unwrap();
    std::fs::write(dir.join("util.vl"), "const int answer = 6 * 7;").unwrap();

    let sink = CaptureSink::new();
    let report = run(
        vectorl::FileSources::with_paths([&dir]),
        "model",
        &RunOptions::default(),
        sink.clone(),
    );
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(report.success, "{:?}", report.messages);
    assert_eq!(sink.lines(), vec!["42"]);
}

#[test]
fn test_runtime_failure_is_reported() {
    let source = r#"
        var int v = [1, 2, 3];
        var int i = 5;
        on Init print v[[i]];
    "#;
    let (report, sink) = run_main(source, &RunOptions::default());
    assert!(!report.success);
    assert_eq!(report.step_count, 1);
    let message = report.messages.last().unwrap();
    assert_eq!(message.kind, Some(ErrorKind::RuntimeFailure));
    assert!(message.text.contains("sys.Init"));
    assert_eq!(message.origin, Some(Origin::new("main", 4)));
    assert!(message.to_string().starts_with("main(4): error: "), "{}", message);
    assert!(sink.lines().is_empty());
}

#[test]
fn test_runtime_failure_points_at_innermost_statement() {
    let source = r#"var int v = [1, 2, 3];
var int i = 0;
event e();
on Init emit e() after 1;
on e {
    i := 7;
    if (i > 2) {
        print i;
        print v[[i]];
    }
}"#;
    let (report, sink) = run_main(source, &RunOptions::default());
    assert!(!report.success);
    assert_eq!(sink.lines(), vec!["7"]);
    let failure = report
        .messages
        .iter()
        .find(|m| m.kind == Some(ErrorKind::RuntimeFailure))
        .unwrap();
    assert_eq!(failure.origin, Some(Origin::new("main", 9)));
    assert!(failure.text.contains("main.e"));
}

#[test]
fn test_negative_delay_is_clamped_with_warning() {
    let source = "event e(); on Init emit e() after -5; on e print now;";
    let (report, sink) = run_main(source, &RunOptions::default());
    assert!(report.success);
    assert_eq!(sink.lines(), vec!["0.0"]);
    assert_eq!(report.messages.len(), 1);
    assert_eq!(report.messages[0].level, vectorl::Level::Warning);
    assert_eq!(report.messages[0].origin, Some(Origin::new("main", 1)));
}
