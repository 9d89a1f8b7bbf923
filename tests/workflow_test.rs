//! End-to-end workflow runs through the public API.

use async_trait::async_trait;
use opflow::{
    parse_yaml, run_bounded, Cancellation, Context, EngineConfig, Interpreter, LanguageModel, NoopListener, Op, Stage,
    Value, Workflow, WorkflowError, OUTPUT_KEY,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Model double that upper-cases the prompt.
struct Shouty;

#[async_trait]
impl LanguageModel for Shouty {
    async fn prompt(&self, _persona: &str, text: &str) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(text.to_uppercase())
    }
}

#[tokio::test]
async fn bindings_flow_left_to_right() {
    init_tracing();
    let interpreter = Interpreter::default();
    let workflow = Workflow::new("abc")
        .add(Op::format("hello").output("A"))
        .add(
            Op::new("join")
                .with_param("items", json!(["{{A}}", "world"]))
                .with_param("separator", " ")
                .output("B"),
        )
        .add(Op::format("{{B}}!").output("C"))
        .build();

    let ctx = workflow.run(&interpreter, Context::new()).await.unwrap();

    assert_eq!(ctx.get("A"), Some(json!("hello")));
    assert_eq!(ctx.get("B"), Some(json!("hello world")));
    assert_eq!(ctx.get("C"), Some(json!("hello world!")));
    assert_eq!(ctx.get(OUTPUT_KEY), Some(json!("hello world!")));
}

#[tokio::test]
async fn sequential_group_does_not_leak() {
    let interpreter = Interpreter::default();
    let workflow = Workflow::new("isolated")
        .add(Op::set("outer").output("name"))
        .add(
            Op::sequential(vec![
                Op::set("inner").output("name").build(),
                Op::format("{{name}}-step").output("scratch").build(),
            ])
            .output("steps"),
        )
        .build();

    let ctx = workflow.run(&interpreter, Context::new()).await.unwrap();

    assert_eq!(ctx.get("name"), Some(json!("outer")));
    assert!(!ctx.contains_key("scratch"));
    assert_eq!(ctx.get("steps"), Some(json!(["inner", "inner-step"])));
}

#[tokio::test]
async fn parallel_writers_race_on_one_key() {
    let interpreter = Interpreter::default();
    let branches: Vec<Op> = (0..5).map(|i| Op::set(i).output("winner").build()).collect();
    let workflow = Workflow::new("race").add(Op::parallel(branches).output("all")).build();

    let ctx = workflow.run(&interpreter, Context::new()).await.unwrap();

    let winner = ctx.get("winner").and_then(|v| v.as_i64()).unwrap();
    assert!((0..5).contains(&winner));
    assert_eq!(ctx.get("all"), Some(json!([0, 1, 2, 3, 4])));
}

#[tokio::test]
async fn map_formats_each_item_in_order() {
    let interpreter = Interpreter::default();
    let workflow = Workflow::new("map")
        .add(Op::map("items", "item", vec![Op::format("{{item}}").build()]).output("strings"))
        .build();

    let ctx = workflow
        .run(&interpreter, Context::new().with("items", json!([1, 2, 3])))
        .await
        .unwrap();

    assert_eq!(ctx.get("strings"), Some(json!(["1", "2", "3"])));
}

#[tokio::test]
async fn scheduler_orders_reverse_completions() {
    let tasks: Vec<_> = (0..10u64)
        .map(|i| move || async move {
            tokio::time::sleep(Duration::from_millis(10 - i)).await;
            Ok(i)
        })
        .collect();

    let results = run_bounded(tasks, 3, &Cancellation::new(), |_| {}).await.unwrap();
    assert_eq!(results, (0..10).collect::<Vec<u64>>());
}

#[tokio::test]
async fn while_with_false_condition_runs_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let interpreter = Interpreter::builder()
        .executor_fn("count", {
            let calls = calls.clone();
            move |_op, _ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Value::Null) }
            }
        })
        .build();
    let workflow = Workflow::new("never")
        .add(Op::repeat_while("keep_going", vec![Op::new("count").build()]))
        .build();

    workflow
        .run(&interpreter, Context::new().with("keep_going", false))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// `while` follows its name: a truthy condition enters the body, which runs
/// until it clears the condition itself.
#[tokio::test]
async fn while_with_true_condition_runs_until_cleared() {
    let calls = Arc::new(AtomicUsize::new(0));
    let interpreter = Interpreter::builder()
        .listener(NoopListener)
        .executor_fn("count", {
            let calls = calls.clone();
            move |_op, ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                ctx.set("keep_going", json!(false));
                async { Ok(Value::Null) }
            }
        })
        .build();
    let workflow = Workflow::new("once")
        .add(Op::repeat_while("keep_going", vec![Op::new("count").build()]))
        .build();

    let ctx = workflow
        .run(&interpreter, Context::new().with("keep_going", true))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.get("keep_going"), Some(json!(false)));
}

#[tokio::test]
async fn listener_sees_every_stage() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let interpreter = Interpreter::builder()
        .listener({
            let events = events.clone();
            move |stage: Stage, op: &Op, ctx: &Context| {
                events.lock().push((stage, op.kind.clone(), ctx.get("x")));
            }
        })
        .build();
    let workflow = Workflow::new("observed").add(Op::set(7).output("x")).build();

    workflow.run(&interpreter, Context::new()).await.unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            (Stage::WorkflowStart, "noop".to_string(), None),
            (Stage::OpPre, "set".to_string(), None),
            (Stage::OpPost, "set".to_string(), Some(json!(7))),
            (Stage::WorkflowDone, "noop".to_string(), Some(json!(7))),
        ]
    );
}

#[tokio::test]
async fn host_executor_overrides_builtin() {
    let interpreter = Interpreter::builder()
        .executor_fn("format", |_op, _ctx| async { Ok(json!("host wins")) })
        .executor_fn("rescan", |op, ctx| async move {
            let source = op.param("source").cloned().unwrap_or_default();
            ctx.set("rescanned", source.clone());
            Ok(source)
        })
        .build();
    let workflow = Workflow::new("host")
        .add(Op::format("ignored").output("f"))
        .add(Op::new("rescan").with_param("source", "warehouse"))
        .build();

    let ctx = workflow.run(&interpreter, Context::new()).await.unwrap();

    assert_eq!(ctx.get("f"), Some(json!("host wins")));
    assert_eq!(ctx.get("rescanned"), Some(json!("warehouse")));
}

#[tokio::test]
async fn prompt_fan_out_with_cap() {
    let interpreter = Interpreter::builder()
        .language_model(Arc::new(Shouty))
        .config(EngineConfig {
            parallel_concurrency: Some(2),
            ..EngineConfig::default()
        })
        .build();

    let prompts: Vec<Op> = ["a", "b", "c"]
        .iter()
        .map(|p| Op::new("prompt").with_param("prompt", format!("say {p}")).build())
        .collect();
    let workflow = Workflow::new("fan-out").add(Op::parallel(prompts).output("replies")).build();

    let ctx = workflow.run(&interpreter, Context::new()).await.unwrap();
    assert_eq!(ctx.get("replies"), Some(json!(["SAY A", "SAY B", "SAY C"])));
}

#[tokio::test]
async fn cancelled_run_is_distinguishable() {
    let cancel = Cancellation::new();
    let started = Arc::new(AtomicUsize::new(0));
    let interpreter = Interpreter::builder()
        .cancellation(cancel.clone())
        .executor_fn("work", {
            let cancel = cancel.clone();
            let started = started.clone();
            move |_op, _ctx| {
                let n = started.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 2 {
                    cancel.cancel();
                }
                async { Ok(Value::Null) }
            }
        })
        .build();

    let branches = (0..6).map(|_| Op::new("work").build()).collect();
    let workflow = Workflow::new("stoppable")
        .add(Op::parallel(branches).with_param("concurrency", 1))
        .add(Op::set("unreachable").output("after"))
        .build();

    let ctx = Context::new();
    let err = workflow.run(&interpreter, ctx.clone()).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(err, WorkflowError::Cancelled));
    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert!(!ctx.contains_key("after"));
}

#[tokio::test]
async fn yaml_definition_runs() {
    let workflow = parse_yaml(
        r#"
name: rows-to-report
ops:
  - kind: map
    inputKey: rows
    itemVariable: row
    outputBinding: lines
    ops:
      - kind: format
        template: "{{row.name}}={{row.score}}"
  - kind: join
    inputKey: lines
    separator: "; "
    outputBinding: report
  - kind: until
    condition: done
    ops:
      - kind: set
        value: true
        outputBinding: done
"#,
    )
    .unwrap();

    let rows = json!([{"name": "a", "score": 1}, {"name": "b", "score": 2}]);
    let ctx = workflow
        .run(&Interpreter::default(), Context::new().with("rows", rows))
        .await
        .unwrap();

    assert_eq!(ctx.get("report"), Some(json!("a=1; b=2")));
    assert_eq!(ctx.get("done"), Some(json!(true)));
}

#[tokio::test]
async fn unknown_kind_aborts_run() {
    let workflow = Workflow::new("typo")
        .add(Op::set(1).output("first"))
        .add(Op::new("fromat").output("second"))
        .add(Op::set(3).output("third"))
        .build();

    let ctx = Context::new();
    let err = workflow.run(&Interpreter::default(), ctx.clone()).await.unwrap_err();

    assert!(err.is_definition_error());
    assert_eq!(ctx.get("first"), Some(json!(1)));
    assert!(!ctx.contains_key("second"));
    assert!(!ctx.contains_key("third"));
}
