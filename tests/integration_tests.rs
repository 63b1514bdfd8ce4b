//! End-to-end tests over HTTP against a scripted Gremlin Server stub.

mod support;

use graphseed_gremlin::{
    GremlinError, HttpSession, RemoteSession, ScriptBuilder, SerializerFormat, SessionConfig,
};
use graphseed_load::batch::RECORD_DELIMITER;
use graphseed_load::{Orchestrator, RunConfig, RunError, WaitPolicy};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;
use support::{dead_port, g_list, g_person, ok, script_error, GremlinStub};

fn config_for(port: u16) -> SessionConfig {
    SessionConfig {
        host: "127.0.0.1".to_string(),
        port,
        request_timeout: Some(Duration::from_secs(10)),
        ..SessionConfig::default()
    }
}

fn script_of(body: &Value) -> &str {
    body["gremlin"].as_str().unwrap_or_default()
}

/// Text between `open` and the next `close` after it.
fn between<'a>(text: &'a str, open: &str, close: char) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let rest = &text[start..];
    rest.find(close).map(|end| &rest[..end])
}

/// Persons an `addV` batch would create. Like Gremlin Server, only
/// statements ending in a terminal step run, plus the script's last one.
fn executed_persons(script: &str) -> Vec<(String, i64)> {
    let statements: Vec<&str> = script.split(RECORD_DELIMITER).collect();
    let last = statements.len().saturating_sub(1);
    statements
        .iter()
        .enumerate()
        .filter(|(i, s)| *i == last || s.ends_with(".iterate()") || s.ends_with(".next()"))
        .filter_map(|(_, s)| {
            let name = between(s, "'name','", '\'')?;
            let age = between(s, "'age',", 'L')?.parse().ok()?;
            Some((name.to_string(), age))
        })
        .collect()
}

/// Answers like a JanusGraph server whose index walks through its lifecycle
/// and which remembers the persons it was asked to create.
fn janus_like() -> impl FnMut(&Value) -> (u16, Value) + Send + 'static {
    let mut status_reads = 0;
    let mut reindexed = false;
    let mut persons: Vec<(String, i64)> = Vec::new();
    move |body| {
        let script = script_of(body);
        if script.contains("addV") {
            persons.extend(executed_persons(script));
            ok(g_list(vec![]))
        } else if script.contains("getIndexStatus") {
            status_reads += 1;
            let status = if reindexed {
                "ENABLED"
            } else if status_reads < 2 {
                "INSTALLED"
            } else {
                "REGISTERED"
            };
            ok(g_list(vec![json!(status)]))
        } else if script.contains("SchemaAction.REINDEX") {
            reindexed = true;
            ok(g_list(vec![]))
        } else if script.contains("valueMap(true)") {
            let rows = persons
                .iter()
                .zip(1i64..)
                .map(|((name, age), id)| g_person(4096 * id, name, *age))
                .collect();
            ok(g_list(rows))
        } else {
            ok(g_list(vec![]))
        }
    }
}

#[test]
fn connect_probes_and_negotiates_graphson() {
    let stub = GremlinStub::start(|_| ok(g_list(vec![json!(1)])));
    let session = HttpSession::connect(config_for(stub.port())).unwrap();
    assert_eq!(session.submissions(), 1);
    assert_eq!(session.url(), format!("http://127.0.0.1:{}/", stub.port()));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].script(), "1");
    assert_eq!(
        requests[0].header("accept"),
        Some(SerializerFormat::GraphsonV2.mime_type())
    );
    assert_eq!(requests[0].header("authorization"), None);
}

#[test]
fn credentials_travel_as_basic_auth() {
    let stub = GremlinStub::start(|_| ok(g_list(vec![json!(1)])));
    let config = SessionConfig {
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
        format: SerializerFormat::GraphsonV3,
        ..config_for(stub.port())
    };
    HttpSession::connect(config).unwrap();

    let requests = stub.requests();
    // base64("admin:secret")
    assert_eq!(
        requests[0].header("authorization"),
        Some("Basic YWRtaW46c2VjcmV0")
    );
    assert_eq!(
        requests[0].header("accept"),
        Some("application/vnd.gremlin-v3.0+json")
    );
}

#[test]
fn read_query_decodes_graphson_rows_and_sends_bindings() {
    let stub = GremlinStub::start(|body| {
        if script_of(body).contains("valueMap") {
            ok(g_list(vec![g_person(4096, "Stew", 23)]))
        } else {
            ok(g_list(vec![json!(1)]))
        }
    });
    let mut session = HttpSession::connect(config_for(stub.port())).unwrap();
    let scripts = ScriptBuilder::new("testgraph");
    let rows = session
        .submit(&scripts.read_vertices("person", 10))
        .unwrap()
        .property_maps()
        .unwrap();
    session.close().unwrap();
    assert!(!session.is_open());
    assert!(matches!(
        session.submit(&ScriptBuilder::probe()),
        Err(GremlinError::Closed)
    ));

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), Some(&json!(4096)));
    assert_eq!(rows[0].label(), Some("person"));
    assert_eq!(rows[0].first("name"), Some(&json!("Stew")));
    assert_eq!(rows[0].first("age"), Some(&json!(23)));

    let body = &stub.requests()[1].body;
    assert_eq!(body["bindings"]["label"], json!("person"));
    assert_eq!(body["bindings"]["limit"], json!(10));
    assert_eq!(body["aliases"]["g"], json!("testgraph_traversal"));
}

#[test]
fn script_errors_surface_the_server_message() {
    let stub = GremlinStub::start(|body| {
        if script_of(body) == "1" {
            ok(g_list(vec![json!(1)]))
        } else {
            script_error("No such property: nope for class: Script7")
        }
    });
    let mut session = HttpSession::connect(config_for(stub.port())).unwrap();
    let err = session
        .submit(&graphseed_gremlin::ScriptRequest::new("nope"))
        .unwrap_err();
    match err {
        GremlinError::Server { code, message } => {
            assert_eq!(code, 500);
            assert!(message.contains("No such property"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[test]
fn rejected_credentials_fail_the_connect() {
    let stub = GremlinStub::start(|_| (401, json!({ "message": "Username and/or password are incorrect" })));
    let config = SessionConfig {
        username: Some("admin".to_string()),
        password: Some("wrong".to_string()),
        ..config_for(stub.port())
    };
    match HttpSession::connect(config) {
        Err(GremlinError::Unauthorized { status, .. }) => assert_eq!(status, 401),
        Err(other) => panic!("expected unauthorized, got {other:?}"),
        Ok(_) => panic!("connect should fail"),
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let err = HttpSession::connect(config_for(dead_port()))
        .err()
        .expect("connect should fail");
    assert!(matches!(err, GremlinError::Transport { .. }), "{err:?}");
}

#[test]
fn full_run_creates_indexes_loads_and_reads_back() {
    let stub = GremlinStub::start(janus_like());
    let dir = tempfile::tempdir().unwrap();

    let vertices = dir.path().join("vertices.txt");
    let mut f = std::fs::File::create(&vertices).unwrap();
    for (name, age) in [("Stew", 23), ("Stevie", 28), ("Patrick", 18), ("Patricia", 41)] {
        writeln!(f, "g.addV('person').property('name','{name}').property('age',{age}L)").unwrap();
    }
    let edges = dir.path().join("edges.txt");
    let mut f = std::fs::File::create(&edges).unwrap();
    writeln!(f, "g.V().has('name','Stew').as('a').V().has('name','Stevie').addE('knows').from('a')").unwrap();
    writeln!(f, "g.V().has('name','Patrick').as('a').V().has('name','Patricia').addE('knows').from('a')").unwrap();

    let mut config = RunConfig::new("testgraph");
    config.create = true;
    config.drop = true;
    config.vertex_file = Some(vertices);
    config.edge_file = Some(edges);
    config.wait = WaitPolicy {
        interval: Duration::from_millis(5),
        timeout: Some(Duration::from_secs(5)),
    };

    let mut printed = Vec::new();
    let report = Orchestrator::new(config)
        .run(&config_for(stub.port()), &mut |row: &graphseed_gremlin::PropertyMap| {
            printed.push(row.to_string())
        })
        .unwrap();

    assert_eq!(report.indexes_enabled, 1);
    assert_eq!(report.vertices.records, 4);
    assert_eq!(report.edges.records, 2);
    assert_eq!(report.data_submissions(), 2);
    // Every record of the single vertex batch ran, not just the last one.
    assert_eq!(report.rows_read, 4);
    assert!(report.dropped);
    assert_eq!(printed.len(), 4);
    assert!(printed[0].contains("Stew"));
    assert!(printed[3].contains("Patricia"));

    let scripts = stub.scripts();
    assert_eq!(scripts[0], "1");
    assert!(scripts[1].contains("ConfiguredGraphFactory.create(graphName)"));
    let data: Vec<&String> = scripts
        .iter()
        .filter(|s| s.contains("testgraph_traversal."))
        .collect();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].matches("addV").count(), 4);
    assert_eq!(data[1].matches("addE").count(), 2);
    assert!(!data[0].contains("\ng."));
    for batch in &data {
        for statement in batch.split(RECORD_DELIMITER) {
            assert!(statement.ends_with(".iterate()"), "not executed: {statement}");
        }
    }
    assert_eq!(scripts.last().map(String::as_str), Some("g.V().drop().iterate()"));

    let register = scripts.iter().position(|s| s.contains("REGISTER_INDEX")).unwrap();
    let reindex = scripts.iter().position(|s| s.contains("SchemaAction.REINDEX")).unwrap();
    let first_load = scripts.iter().position(|s| s.contains("addV")).unwrap();
    assert!(register < reindex && reindex < first_load);
}

#[test]
fn failed_load_still_reports_the_remote_phase() {
    let mut inner = janus_like();
    let stub = GremlinStub::start(move |body| {
        if script_of(body).contains("addV") {
            script_error("Vertex with given name already exists")
        } else {
            inner(body)
        }
    });

    let mut config = RunConfig::new("testgraph");
    config.create = true;
    config.wait = WaitPolicy {
        interval: Duration::from_millis(5),
        timeout: Some(Duration::from_secs(5)),
    };

    let err = Orchestrator::new(config)
        .run(&config_for(stub.port()), &mut |_: &graphseed_gremlin::PropertyMap| {})
        .unwrap_err();
    assert!(matches!(err, RunError::Load { .. }), "{err:?}");
    assert!(!stub.scripts().iter().any(|s| s.contains("valueMap")));
}

#[test]
fn refused_connection_submits_nothing() {
    let mut config = RunConfig::new("testgraph");
    config.create = true;
    let err = Orchestrator::new(config)
        .run(&config_for(dead_port()), &mut |_: &graphseed_gremlin::PropertyMap| {})
        .unwrap_err();
    assert!(matches!(err, RunError::Connect(_)), "{err:?}");
}
