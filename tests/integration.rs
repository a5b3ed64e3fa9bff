use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use promise_ipc::{
    //
    create_memory_transport_with_hub,
    Args,
    Caller,
    Channel,
    CorrelationId,
    Envelope,
    IpcConfig,
    MemoryHub,
    ObjectRef,
    PromiseIpc,
    PromiseIpcBuilder,
    Result,
    RpcError,
    Thrown,
    TransportPtr,
};

const TOKEN: &str = "totally_random_uuid";

/// Two transports on a private hub: the "main" side and the "renderer" side.
async fn bus() -> Result<(Arc<MemoryHub>, TransportPtr, TransportPtr)> {
    // ---
    let hub = MemoryHub::new();
    let main = create_memory_transport_with_hub("main", hub.clone()).await?;
    let renderer = create_memory_transport_with_hub("renderer", hub.clone()).await?;
    Ok((hub, main, renderer))
}

fn fixed_caller(transport: TransportPtr, config: IpcConfig) -> Caller {
    Caller::with_token_source(transport, config, || CorrelationId::from(TOKEN))
}

/// Answer the next request on `route` with `[status, payload]`, straight on
/// the bus. Resolves to the arguments the request carried.
async fn reply_once(
    transport: &TransportPtr,
    route: &str,
    status: Value,
    payload: Value,
) -> Result<JoinHandle<Vec<Value>>> {
    // ---
    let mut sub = transport.subscribe(Channel::from(route)).await?;
    let transport = transport.clone();

    Ok(tokio::spawn(async move {
        let env = sub.inbox.recv().await.expect("request never arrived");
        let args = env.args().expect("request is not an array");
        let reply_channel = args[0].as_str().expect("reply channel").to_string();

        let reply = Envelope::from_args(reply_channel, &[status, payload]).unwrap();
        transport.publish(reply).await.unwrap();
        args
    }))
}

/// Publish `[replyChannel, ...args]` on `route` straight on the bus and
/// return the reply's `[status, payload]`.
async fn request_raw(transport: &TransportPtr, route: &str, args: Vec<Value>) -> Vec<Value> {
    // ---
    let mut replies = transport
        .subscribe(Channel::from("replyChannel"))
        .await
        .unwrap();

    let mut wire = vec![json!("replyChannel")];
    wire.extend(args);
    transport
        .publish(Envelope::from_args(route, &wire).unwrap())
        .await
        .unwrap();

    let env = tokio::time::timeout(Duration::from_secs(1), replies.inbox.recv())
        .await
        .expect("timed out waiting for reply")
        .expect("reply subscription closed");
    env.args().unwrap()
}

// --------------------
// send
// --------------------

#[tokio::test]
async fn test_resolves_to_sent_data_on_success() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let listener = reply_once(&main, "route", json!("success"), json!("result")).await?;

    let caller = fixed_caller(renderer, IpcConfig::default());
    let result = caller
        .send("route", vec![json!("dataArg1"), json!("dataArg2")])
        .await?;

    assert_eq!(result, json!("result"));
    listener.await.unwrap();
    Ok(())
}

#[tokio::test]
async fn test_sends_reply_channel_and_arguments() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let listener = reply_once(&main, "route", json!("success"), json!("result")).await?;

    let caller = fixed_caller(renderer, IpcConfig::default());
    caller
        .send("route", vec![json!("dataArg1"), json!("dataArg2")])
        .await?;

    let seen = listener.await.unwrap();
    assert_eq!(
        seen,
        vec![
            json!("route#totally_random_uuid"),
            json!("dataArg1"),
            json!("dataArg2")
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_rejects_with_passed_message_on_failure() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let _listener = reply_once(
        &main,
        "route",
        json!("failure"),
        json!({"name": "Error", "message": "an error message"}),
    )
    .await?;

    let caller = fixed_caller(renderer, IpcConfig::default());
    let err = caller
        .send("route", vec![json!("dataArg1"), json!("dataArg2")])
        .await
        .unwrap_err();

    match err {
        RpcError::Remote(remote) => {
            assert_eq!(remote.name(), "Error");
            assert_eq!(remote.message(), "an error message");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_rejects_on_unrecognized_status() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let _listener = reply_once(
        &main,
        "route",
        json!("unrecognized"),
        json!("an error message"),
    )
    .await?;

    let caller = fixed_caller(renderer, IpcConfig::default());
    let err = caller
        .send("route", vec![json!("dataArg1"), json!("dataArg2")])
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::UnexpectedStatus { .. }));
    assert_eq!(
        err.to_string(),
        "Unexpected IPC call status \"unrecognized\" in route"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_fails_if_it_times_out() -> Result<()> {
    // ---
    init_logging();

    let (_hub, _main, renderer) = bus().await?;
    let caller = fixed_caller(renderer, IpcConfig::default().with_max_timeout_ms(5000));

    let started = tokio::time::Instant::now();
    let err = caller
        .send("route", vec![json!("dataArg1"), json!("dataArg2")])
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::Timeout { .. }));
    assert_eq!(err.to_string(), "route timed out.");
    assert!(started.elapsed() >= Duration::from_millis(5000));
    assert_eq!(caller.pending_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_swallows_reply_after_timeout() -> Result<()> {
    // ---
    init_logging();

    let (hub, main, renderer) = bus().await?;

    let mut requests = main.subscribe(Channel::from("route")).await?;
    let late = {
        let main = main.clone();
        tokio::spawn(async move {
            let env = requests.inbox.recv().await.expect("request never arrived");
            let reply_channel = env.args().unwrap()[0].as_str().unwrap().to_string();

            tokio::time::sleep(Duration::from_millis(6000)).await;
            let reply =
                Envelope::from_args(reply_channel, &[json!("success"), json!("a message")])
                    .unwrap();
            main.publish(reply).await
        })
    };

    let caller = fixed_caller(renderer, IpcConfig::default().with_max_timeout_ms(5000));
    let err = caller
        .send("route", vec![json!("dataArg1"), json!("dataArg2")])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "route timed out.");

    // The late reply is published to a channel nobody listens on anymore.
    late.await.unwrap()?;

    let reply_channel = Channel::from(format!("route#{TOKEN}"));
    assert_eq!(hub.subscriber_count(&reply_channel).await, 0);
    assert_eq!(caller.pending_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_times_out_while_route_inbox_is_full() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;

    // A subscriber that never reads, with its inbox already full.
    let _stuck = main.subscribe(Channel::from("route")).await?;
    for n in 0..64 {
        main.publish(Envelope::from_args("route", &[json!(n)])?)
            .await?;
    }

    let caller = Caller::with_config(renderer, IpcConfig::default().with_max_timeout_ms(100));

    let started = tokio::time::Instant::now();
    let outcome = tokio::time::timeout(Duration::from_secs(2), caller.send("route", vec![]))
        .await
        .expect("call must settle on its own timeout");

    let err = outcome.unwrap_err();
    assert_eq!(err.to_string(), "route timed out.");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(caller.pending_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_per_call_timeout_overrides_config() -> Result<()> {
    // ---
    init_logging();

    let (_hub, _main, renderer) = bus().await?;
    let caller = Caller::new(renderer);

    let started = tokio::time::Instant::now();
    let err = caller
        .send_with_timeout("slow", vec![], Duration::from_millis(250))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "slow timed out.");
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(started.elapsed() < Duration::from_millis(5000));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_token_in_flight_is_rejected() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let gate = Arc::new(Notify::new());

    let responder = PromiseIpc::new(main);
    {
        let gate = gate.clone();
        responder
            .on("route", move |_args: Args| {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok::<_, Thrown>("done")
                }
            })
            .await?;
    }

    let caller = fixed_caller(renderer, IpcConfig::default());
    let first = {
        let caller = caller.clone();
        tokio::spawn(async move { caller.send("route", vec![]).await })
    };

    while caller.pending_count() == 0 {
        tokio::task::yield_now().await;
    }

    let err = caller.send("route", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::CorrelationInUse(_)));

    gate.notify_one();
    assert_eq!(first.await.unwrap()?, json!("done"));
    Ok(())
}

#[tokio::test]
async fn test_same_token_on_different_routes_runs_concurrently() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let gate = Arc::new(Semaphore::new(0));

    let server = PromiseIpc::new(main);
    for route in ["a", "b"] {
        let gate = gate.clone();
        server
            .on(route, move |_args: Args| {
                let gate = gate.clone();
                async move {
                    let _permit = gate.acquire().await.expect("gate closed");
                    Ok::<_, Thrown>(route)
                }
            })
            .await?;
    }

    let caller = fixed_caller(renderer, IpcConfig::default());
    let first = {
        let caller = caller.clone();
        tokio::spawn(async move { caller.send("a", vec![]).await })
    };
    let second = {
        let caller = caller.clone();
        tokio::spawn(async move { caller.send("b", vec![]).await })
    };

    while caller.pending_count() < 2 {
        tokio::task::yield_now().await;
    }

    gate.add_permits(2);

    assert_eq!(first.await.unwrap()?, json!("a"));
    assert_eq!(second.await.unwrap()?, json!("b"));
    Ok(())
}

// --------------------
// on
// --------------------

#[tokio::test]
async fn test_on_resolved_future_sends_success() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on("route", |_args: Args| async { Ok::<_, Thrown>("foober") })
        .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply, vec![json!("success"), json!("foober")]);
    Ok(())
}

#[tokio::test]
async fn test_on_sync_return_sends_success() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on_sync("route", |_args: Args| Ok::<_, Thrown>("foober"))
        .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply, vec![json!("success"), json!("foober")]);
    Ok(())
}

#[tokio::test]
async fn test_on_rejected_future_sends_failure() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on("route", |_args: Args| async {
        Err::<Value, _>(Thrown::error("foober"))
    })
    .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply[0], json!("failure"));
    assert_eq!(reply[1]["name"], json!("Error"));
    assert_eq!(reply[1]["message"], json!("foober"));
    Ok(())
}

#[tokio::test]
async fn test_on_rejects_with_simple_string() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on("route", |_args: Args| async {
        Err::<Value, _>(Thrown::from("goober"))
    })
    .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply, vec![json!("failure"), json!("goober")]);
    Ok(())
}

#[tokio::test]
async fn test_on_rejects_with_function() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on("route", |_args: Args| async {
        Err::<Value, _>(Thrown::function())
    })
    .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply, vec![json!("failure"), json!("[Function: anonymous]")]);
    Ok(())
}

fn custom_error() -> Thrown {
    // ---
    let custom = ObjectRef::error("message");
    custom
        .set("obj", json!({"foo": "bar"}))
        .set("array", json!(["one", "two"]))
        .set("func", Thrown::function())
        .set("self", custom.backref());
    Thrown::from(custom)
}

#[tokio::test]
async fn test_on_rejects_with_custom_error() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on("route", |_args: Args| async { Err::<Value, _>(custom_error()) })
        .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply[0], json!("failure"));

    let result = &reply[1];
    assert_eq!(result["message"], json!("message"));
    assert_eq!(result["obj"], json!({"foo": "bar"}));
    assert_eq!(result["array"], json!(["one", "two"]));
    assert!(result.get("func").is_none());
    assert_eq!(result["self"], json!("[Circular]"));
    Ok(())
}

#[tokio::test]
async fn test_on_panic_sends_failure() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on_sync("route", |_args: Args| -> std::result::Result<Value, Thrown> {
        panic!("oh no")
    })
    .await?;

    let reply = request_raw(&main, "route", vec![json!("dataArg1")]).await;
    assert_eq!(reply[0], json!("failure"));
    assert_eq!(reply[1]["name"], json!("Error"));
    assert_eq!(reply[1]["message"], json!("oh no"));

    // The route keeps serving after a panic.
    let again = request_raw(&main, "route", vec![]).await;
    assert_eq!(again[0], json!("failure"));
    Ok(())
}

#[tokio::test]
async fn test_on_passes_received_arguments() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let ipc = PromiseIpc::new(renderer);
    ipc.on("route", |args: Args| async move {
        let parts: Vec<String> = args
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect();
        Ok::<_, Thrown>(parts.join(","))
    })
    .await?;

    let reply = request_raw(&main, "route", vec![json!("foo"), json!("bar"), json!("baz")]).await;
    assert_eq!(reply, vec![json!("success"), json!("foo,bar,baz")]);
    Ok(())
}

// --------------------
// round trips
// --------------------

#[tokio::test]
async fn test_round_trip_delivers_arguments_unchanged() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on("echo", |args: Args| async move { Ok::<_, Thrown>(args.into_vec()) })
        .await?;

    let client = PromiseIpc::new(renderer);
    let args = vec![json!(1), json!("two"), json!({"three": [3]}), Value::Null];
    let echoed = client.send("echo", args.clone()).await?;

    assert_eq!(echoed, Value::Array(args));
    Ok(())
}

#[tokio::test]
async fn test_round_trip_typed_call() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on("math/add", |args: Args| async move {
            let a: i64 = args.parse(0)?;
            let b: i64 = args.parse(1)?;
            Ok::<_, Thrown>(a + b)
        })
        .await?;

    let client = PromiseIpc::new(renderer);
    let sum: i64 = client.call("math/add", vec![json!(20), json!(3)]).await?;
    assert_eq!(sum, 23);

    let err = client
        .call::<i64>("math/add", vec![json!("x")])
        .await
        .unwrap_err();
    match err {
        RpcError::Remote(remote) => assert_eq!(remote.name(), "TypeError"),
        other => panic!("expected TypeError, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_round_trip_bare_string_rejection() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on("route", |_args: Args| async {
            Err::<Value, _>(Thrown::from("goober"))
        })
        .await?;

    let client = PromiseIpc::new(renderer);
    match client.send("route", vec![]).await.unwrap_err() {
        RpcError::Rejected(value) => assert_eq!(value, json!("goober")),
        other => panic!("expected raw rejection, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_round_trip_custom_error() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on("route", |_args: Args| async { Err::<Value, _>(custom_error()) })
        .await?;

    let client = PromiseIpc::new(renderer);
    match client.send("route", vec![]).await.unwrap_err() {
        RpcError::Remote(remote) => {
            assert_eq!(remote.message(), "message");
            assert_eq!(remote.get("obj"), Some(&json!({"foo": "bar"})));
            assert_eq!(remote.get("array"), Some(&json!(["one", "two"])));
            assert_eq!(remote.get("func"), None);
            assert_eq!(remote.get("self"), Some(&json!("[Circular]")));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_round_trip_forwards_upstream_failure() -> Result<()> {
    // ---
    init_logging();

    let (hub, main, renderer) = bus().await?;
    let backend = create_memory_transport_with_hub("backend", hub.clone()).await?;

    let storage = PromiseIpc::new(backend);
    storage
        .on("storage/read", |_args: Args| async {
            let err = ObjectRef::named_error("NotFoundError", "no such key");
            err.set("key", json!("settings"));
            Err::<Value, _>(Thrown::from(err))
        })
        .await?;

    // A middle hop that calls upstream and hands any failure back unchanged.
    let proxy = PromiseIpc::new(main);
    {
        let upstream = proxy.caller().clone();
        proxy
            .on("settings/load", move |_args: Args| {
                let upstream = upstream.clone();
                async move {
                    let value = upstream.send("storage/read", vec![]).await?;
                    Ok::<_, Thrown>(value)
                }
            })
            .await?;
    }

    let client = PromiseIpc::new(renderer);
    match client.send("settings/load", vec![]).await.unwrap_err() {
        RpcError::Remote(remote) => {
            assert_eq!(remote.name(), "NotFoundError");
            assert_eq!(remote.message(), "no such key");
            assert_eq!(remote.get("key"), Some(&json!("settings")));
        }
        other => panic!("expected forwarded error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls_settle_independently() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on("delay", |args: Args| async move {
            let millis: u64 = args.parse(0)?;
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<_, Thrown>(millis)
        })
        .await?;

    let client = PromiseIpc::new(renderer);
    let mut tasks = Vec::new();
    for millis in [60u64, 10, 40, 0, 20] {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let got: u64 = client.call("delay", vec![json!(millis)]).await?;
            Ok::<_, RpcError>((millis, got))
        }));
    }

    for task in tasks {
        let (sent, got) = task.await.unwrap()?;
        assert_eq!(sent, got);
    }
    assert_eq!(client.pending_count(), 0);
    Ok(())
}

// --------------------
// registration
// --------------------

#[tokio::test]
async fn test_last_registration_wins() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on_sync("route", |_args: Args| Ok::<_, Thrown>("first"))
        .await?;
    server
        .on_sync("route", |_args: Args| Ok::<_, Thrown>("second"))
        .await?;

    assert_eq!(server.responder().routes(), vec!["route".to_string()]);

    let client = PromiseIpc::new(renderer);
    assert_eq!(client.send("route", vec![]).await?, json!("second"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_off_stops_serving_route() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    server
        .on_sync("route", |_args: Args| Ok::<_, Thrown>("here"))
        .await?;

    let client = PromiseIpc::new(renderer);
    assert_eq!(client.send("route", vec![]).await?, json!("here"));

    assert!(server.off("route"));
    assert!(!server.off("route"));
    assert!(server.responder().routes().is_empty());

    let err = client
        .send_with_timeout("route", vec![], Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Timeout { .. }));
    Ok(())
}

#[tokio::test]
async fn test_stale_token_does_not_remove_newer_handler() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let server = PromiseIpc::new(main);
    let old = server
        .on_sync("route", |_args: Args| Ok::<_, Thrown>(1))
        .await?;
    let current = server
        .on_sync("route", |_args: Args| Ok::<_, Thrown>(2))
        .await?;

    assert_eq!(old.route(), "route");
    assert!(!server.remove(&old));

    let client = PromiseIpc::new(renderer);
    assert_eq!(client.send("route", vec![]).await?, json!(2));

    assert!(server.remove(&current));
    assert!(!server.remove(&current));
    Ok(())
}

#[tokio::test]
async fn test_builder_applies_timeout_and_tokens() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let listener = reply_once(&main, "route", json!("success"), json!(true)).await?;

    let ipc = PromiseIpcBuilder::new(renderer)
        .max_timeout_ms(2500)
        .token_source(|| CorrelationId::from(TOKEN))
        .build();

    assert_eq!(ipc.config().max_timeout, Some(Duration::from_millis(2500)));
    assert_eq!(ipc.send("route", vec![]).await?, json!(true));
    assert_eq!(listener.await.unwrap()[0], json!("route#totally_random_uuid"));
    Ok(())
}

// --------------------
// shutdown
// --------------------

#[tokio::test]
async fn test_shutdown_fails_in_flight_calls() -> Result<()> {
    // ---
    init_logging();

    let (_hub, main, renderer) = bus().await?;
    let arrived = Arc::new(Notify::new());

    let server = PromiseIpc::new(main);
    {
        let arrived = arrived.clone();
        server
            .on("never", move |_args: Args| {
                let arrived = arrived.clone();
                async move {
                    arrived.notify_one();
                    std::future::pending::<()>().await;
                    Ok::<_, Thrown>(Value::Null)
                }
            })
            .await?;
    }

    let client = PromiseIpc::new(renderer);
    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.send("never", vec![]).await })
    };

    // The handler running means the reply channel is already subscribed.
    arrived.notified().await;
    client.shutdown().await?;

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, RpcError::Transport(_)));
    assert_eq!(client.pending_count(), 0);
    Ok(())
}

#[cfg(feature = "logging")]
fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[cfg(not(feature = "logging"))]
fn init_logging() {}
