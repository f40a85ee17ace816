mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use maplit::btreemap;
use wfl::{
    parse, Evaluator, Failure, MemoryStore, Options, Outcome, Registry, Repeat, Store, Value,
};

use common::{captured, record, record_delayed, record_failing, record_returning, s, Calls};

/// Returns its second positional argument, like a copy reporting its target.
fn returns_destination(_: &Options, args: &[Value]) -> Outcome {
    Outcome::Value(args.get(1).cloned().unwrap_or(Value::Absent))
}

#[tokio::test]
async fn test_sequential_commands() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "cp");
    record(&mut registry, &calls, "mv");

    let actions = parse("cp /a /b\nmv /a /c --force").unwrap();
    assert_eq!(actions.len(), 2);
    Evaluator::new(registry).run(&actions).await.unwrap();

    let all = calls.all();
    assert_eq!(calls.names(), vec!["cp", "mv"]);
    assert_eq!(all[0].options, Options::new());
    assert_eq!(all[0].args, vec![s("/a"), s("/b")]);
    assert_eq!(all[1].options, btreemap! { "force".to_string() => Value::Bool(true) });
    assert_eq!(all[1].args, vec![s("/a"), s("/c")]);
}

#[tokio::test]
async fn test_captured_result_flows_into_later_commands() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_returning(&mut registry, &calls, "cp", returns_destination);
    record(&mut registry, &calls, "mv");

    let source = "
    $result = cp /test3 /test4
    cp /test4 /test5 --opt=$result
    mv /test7 $result --force
    ";
    let store = Arc::new(MemoryStore::new());
    let actions = parse(source).unwrap();
    Evaluator::new(registry)
        .run_with_store(&actions, store.clone())
        .await
        .unwrap();

    let cp = calls.of("cp");
    assert_eq!(cp[0].options, captured());
    assert_eq!(cp[0].args, vec![s("/test3"), s("/test4")]);
    assert_eq!(cp[1].options, btreemap! { "opt".to_string() => s("/test4") });
    assert_eq!(
        calls.of("mv")[0].args,
        vec![s("/test7"), s("/test4")]
    );
    assert_eq!(store.get("result"), s("/test4"));
}

#[tokio::test]
async fn test_capture_flag_does_not_override_explicit_option() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "cp");

    let actions = parse("$r = cp /a --__hasReturn=false").unwrap();
    Evaluator::new(registry).run(&actions).await.unwrap();

    assert_eq!(
        calls.of("cp")[0].options,
        btreemap! { wfl::CAPTURE_FLAG.to_string() => Value::Bool(false) }
    );
}

#[tokio::test]
async fn test_nested_block_runs_after_parent() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "watch");
    record(&mut registry, &calls, "mkdir");

    let actions = parse("watch /d { mkdir /e }").unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].children.len(), 1);
    Evaluator::new(registry).run(&actions).await.unwrap();

    assert_eq!(calls.names(), vec!["watch", "mkdir"]);
    assert_eq!(calls.of("mkdir")[0].args, vec![s("/e")]);
}

#[tokio::test]
async fn test_nested_blocks_see_parent_variables() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_returning(&mut registry, &calls, "fetch", |_, _| Outcome::from("fetch_test"));
    record_returning(&mut registry, &calls, "otherFunction", |_, _| {
        Outcome::from("otherFunction_test")
    });
    record(&mut registry, &calls, "otherFunctionSub");

    let source = "
    $fetch = fetch {
      $otherFunction = otherFunction $fetch {
        otherFunctionSub $otherFunction
      }
    }
    ";
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let other = &calls.of("otherFunction")[0];
    assert_eq!(other.options, captured());
    assert_eq!(other.args, vec![s("fetch_test")]);
    let sub = &calls.of("otherFunctionSub")[0];
    assert_eq!(sub.options, Options::new());
    assert_eq!(sub.args, vec![s("otherFunction_test")]);
}

#[tokio::test]
async fn test_synchronous_commands_wait_for_suspension() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_delayed(&mut registry, &calls, "slow", 100, s("done"));
    record(&mut registry, &calls, "log");

    let started = tokio::time::Instant::now();
    let actions = parse("$x = slow\nlog $x").unwrap();
    Evaluator::new(registry).run(&actions).await.unwrap();

    let log = &calls.of("log")[0];
    assert_eq!(log.args, vec![s("done")]);
    assert!(log.at - started >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_unset_variable_is_absent() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "log");

    let actions = parse("log $nope --opt=$nope").unwrap();
    Evaluator::new(registry).run(&actions).await.unwrap();

    let log = &calls.of("log")[0];
    assert_eq!(log.args, vec![Value::Absent]);
    assert_eq!(log.options, btreemap! { "opt".to_string() => Value::Absent });
}

#[tokio::test(start_paused = true)]
async fn test_async_branches_race_without_ordering() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_delayed(&mut registry, &calls, "fetch", 1000, s("fetch_test"));
    record_delayed(&mut registry, &calls, "fetch2", 500, s("fetch_test2"));
    record(&mut registry, &calls, "touch");
    record(&mut registry, &calls, "cp");

    let source = "
    $resultFetch = fetch http://teste.com.br --async {
      touch /test/result $resultFetch
      $resultFetch4 = fetch2 http://teste5.com.br --async {
        cp /teste $resultFetch4
      }
    }

    $resultFetch2 = fetch2 http://teste.com.br --async {
      cp /test/result $resultFetch2 $resultFetch
      $resultFetch3 = fetch http://teste2.com.br --async {
        touch /teste $resultFetch3
      }
    }
    ";
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let touch = calls.of("touch");
    let cp = calls.of("cp");
    assert_eq!(touch[0].options, Options::new());
    assert_eq!(touch[0].args, vec![s("/test/result"), s("fetch_test")]);
    assert_eq!(cp[0].options, Options::new());
    assert_eq!(
        cp[0].args,
        vec![s("/test/result"), s("fetch_test2"), Value::Absent]
    );

    // The run is not finished until the nested async branches are.
    assert_eq!(touch.len(), 2);
    assert_eq!(cp.len(), 2);
    assert!(touch.iter().any(|c| c.args == vec![s("/teste"), s("fetch_test")]));
    assert!(cp.iter().any(|c| c.args == vec![s("/teste"), s("fetch_test2")]));

    let fetch = &calls.of("fetch")[0];
    assert_eq!(fetch.options.get(wfl::ASYNC_OPTION), Some(&Value::Bool(true)));
    assert_eq!(fetch.options.get(wfl::CAPTURE_FLAG), Some(&Value::Bool(true)));
}

#[tokio::test(start_paused = true)]
async fn test_async_action_does_not_block_the_sequence() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_delayed(&mut registry, &calls, "slow", 200, s("late"));
    record(&mut registry, &calls, "log");

    let source = "
    $x = slow --async {
      log inner $x
    }
    log outer $x
    ";
    let started = tokio::time::Instant::now();
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let log = calls.of("log");
    assert_eq!(log[0].args, vec![s("outer"), Value::Absent]);
    assert!(log[0].at - started < Duration::from_millis(200));
    assert_eq!(log[1].args, vec![s("inner"), s("late")]);
    assert!(log[1].at - started >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_repeat_binds_each_item() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    registry.register_fn("each", |_, items| Ok(Outcome::repeat(items)));
    record(&mut registry, &calls, "log");

    let source = "
    $item = each 1 2 3 {
      log $item
    }
    ";
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let args: Vec<Vec<Value>> = calls.of("log").into_iter().map(|c| c.args).collect();
    assert_eq!(args, vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]]);
    assert!(calls.of("log").iter().all(|c| c.options.is_empty()));
}

fn plus_one(value: Value) -> Value {
    match value {
        Value::Int(n) => Value::Int(n + 1),
        other => other,
    }
}

#[tokio::test]
async fn test_repeat_with_transform() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    registry.register_fn("each", |_, items| {
        Ok(Repeat::new(items).with_transform(plus_one).into())
    });
    record(&mut registry, &calls, "log");

    let source = "$item = each 1 2 3 {\n  log $item\n}";
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let args: Vec<Vec<Value>> = calls.of("log").into_iter().map(|c| c.args).collect();
    assert_eq!(args, vec![vec![Value::Int(2)], vec![Value::Int(3)], vec![Value::Int(4)]]);
}

#[tokio::test]
async fn test_repeat_runs_every_child_per_item() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    registry.register_fn("each", |_, items| {
        Ok(Repeat::new(items).with_transform(plus_one).into())
    });
    registry.register_fn("sum", |_, args| {
        let total: i64 = args.iter().filter_map(Value::as_int).sum();
        Ok(Outcome::from(total))
    });
    record(&mut registry, &calls, "log");

    let source = "
    $item = each 1 2 3 {
      $sum = sum $item 3
      log $sum
    }
    ";
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let args: Vec<Vec<Value>> = calls.of("log").into_iter().map(|c| c.args).collect();
    assert_eq!(args, vec![vec![Value::Int(5)], vec![Value::Int(6)], vec![Value::Int(7)]]);
}

#[tokio::test]
async fn test_repeat_without_variable_or_children() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    registry.register_fn("each", |_, items| Ok(Outcome::repeat(items)));
    record(&mut registry, &calls, "log");

    let store = Arc::new(MemoryStore::new());
    let source = "each a b { log x }\n$last = each 1 2 3";
    Evaluator::new(registry)
        .run_with_store(&parse(source).unwrap(), store.clone())
        .await
        .unwrap();

    assert_eq!(calls.of("log").len(), 2);
    assert_eq!(store.snapshot(), HashMap::from([("last".to_string(), Value::Int(3))]));
}

#[tokio::test(start_paused = true)]
async fn test_repeat_inside_async_branch() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    registry.register_async("later", |_, items| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, wfl::CommandError>(Outcome::repeat(items))
    });
    record(&mut registry, &calls, "log");

    let source = "$i = later x y --async {\n  log $i\n}\nlog first";
    Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap();

    let args: Vec<Vec<Value>> = calls.of("log").into_iter().map(|c| c.args).collect();
    assert_eq!(args, vec![vec![s("first")], vec![s("x")], vec![s("y")]]);
}

#[tokio::test]
async fn test_unknown_command_halts_the_sequence() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "ok");

    let actions = parse("ok\nmissing /x\nok").unwrap();
    let err = Evaluator::new(registry).run(&actions).await.unwrap_err();

    assert_eq!(calls.of("ok").len(), 1);
    assert_eq!(err.failures.len(), 1);
    assert!(matches!(
        &err.failures[0],
        Failure::UnknownCommand { command, line: 2 } if command == "missing"
    ));
}

#[tokio::test]
async fn test_command_failure_halts_the_sequence() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "ok");
    record_failing(&mut registry, &calls, "boom");

    let actions = parse("ok\nwrap {\n  boom\n}\nok").unwrap();
    registry.register_fn("wrap", |_, _| Ok(Outcome::none()));
    let err = Evaluator::new(registry).run(&actions).await.unwrap_err();

    assert_eq!(calls.names(), vec!["ok", "boom"]);
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].command(), "boom");
    assert_eq!(err.failures[0].line(), 3);
    assert!(err.to_string().contains("boom exploded"));
}

#[tokio::test]
async fn test_async_failures_are_collected_without_stopping_siblings() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "ok");
    record_failing(&mut registry, &calls, "boom");

    let source = "boom --async\nboom --async { ok nested }\nok after";
    let err = Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap_err();

    assert_eq!(calls.of("ok").len(), 1);
    assert_eq!(calls.of("ok")[0].args, vec![s("after")]);
    let mut lines: Vec<usize> = err.failures.iter().map(Failure::line).collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![1, 2]);
}

#[tokio::test]
async fn test_unknown_async_command_fails_only_its_branch() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "ok");

    let source = "missing --async { ok nested }\nok after";
    let err = Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap_err();

    assert_eq!(calls.of("ok").len(), 1);
    assert_eq!(calls.of("ok")[0].args, vec![s("after")]);
    assert_eq!(err.failures.len(), 1);
    assert!(matches!(
        &err.failures[0],
        Failure::UnknownCommand { command, line: 1 } if command == "missing"
    ));
}

#[tokio::test]
async fn test_panicking_async_command_is_reported() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "ok");
    registry.register_fn("boom", |_, _| panic!("kaboom"));

    let err = Evaluator::new(registry)
        .run(&parse("boom --async\nok").unwrap())
        .await
        .unwrap_err();

    assert_eq!(calls.names(), vec!["ok"]);
    assert_eq!(err.failures.len(), 1);
    assert!(matches!(
        &err.failures[0],
        Failure::Panicked { command, line: 1, message } if command == "boom" && message == "kaboom"
    ));
}

#[tokio::test]
async fn test_panicking_command_halts_the_sequence() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record(&mut registry, &calls, "ok");
    registry.register_fn("boom", |_, _| panic!("kaboom {}", 2));

    let err = Evaluator::new(registry)
        .run(&parse("ok\nboom\nok").unwrap())
        .await
        .unwrap_err();

    assert_eq!(calls.of("ok").len(), 1);
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].line(), 2);
    assert!(err.to_string().contains("'boom' panicked: kaboom 2"));
}

#[tokio::test]
async fn test_sync_failure_still_waits_for_async_branches() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_delayed(&mut registry, &calls, "slow", 50, s("v"));
    record(&mut registry, &calls, "log");
    record_failing(&mut registry, &calls, "boom");

    let source = "$v = slow --async { log $v }\nboom";
    let err = Evaluator::new(registry)
        .run(&parse(source).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.failures.len(), 1);
    assert_eq!(calls.of("log")[0].args, vec![s("v")]);
}

/// A host store that records every write.
#[derive(Default)]
struct SpyStore {
    values: Mutex<HashMap<String, Value>>,
    writes: Mutex<Vec<(String, Value)>>,
}

impl Store for SpyStore {
    fn get(&self, name: &str) -> Value {
        self.values
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(Value::Absent)
    }

    fn set(&self, name: &str, value: Value) {
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), value.clone()));
        self.values.lock().unwrap().insert(name.to_string(), value);
    }
}

#[tokio::test]
async fn test_host_store_receives_writes() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_returning(&mut registry, &calls, "cp", |_, _| Outcome::from("teste"));
    record(&mut registry, &calls, "mv");

    let store = Arc::new(SpyStore::default());
    let source = "$result = cp /test3 /test4\ncp /test4 /test5\nmv /test7 /test8 --force";
    wfl::run_source_with_store(source, registry, store.clone())
        .await
        .unwrap();

    assert_eq!(
        *store.writes.lock().unwrap(),
        vec![("result".to_string(), s("teste"))]
    );
    assert_eq!(calls.of("cp")[1].options, Options::new());
}

#[tokio::test]
async fn test_evaluator_is_reusable_with_fresh_stores() {
    let calls = Calls::default();
    let mut registry = Registry::new();
    record_returning(&mut registry, &calls, "get", |_, _| Outcome::from(1_i64));
    record(&mut registry, &calls, "log");

    let evaluator = Evaluator::new(registry);
    evaluator.run(&parse("log $x").unwrap()).await.unwrap();
    evaluator.run(&parse("$x = get").unwrap()).await.unwrap();
    evaluator.run(&parse("log $x").unwrap()).await.unwrap();

    let log = calls.of("log");
    assert_eq!(log[0].args, vec![Value::Absent]);
    assert_eq!(log[1].args, vec![Value::Absent]);
}
