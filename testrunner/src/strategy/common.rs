//! Building blocks shared by the strategies
//!
//! Validation, default-filling and start-up for each collaborator a suite
//! can depend on: the server under test, the object store, the graph
//! database, the UDF dispatchers and the test drivers.

use std::path::{Path, PathBuf};

use crate::config::credentials::flag_env_default;
use crate::config::defaults::*;
use crate::config::run_config::{fill_path, fill_str, is_blank, required};
use crate::config::{EnvSource, RunConfiguration};
use crate::context::RunContext;
use crate::error::{RunnerError, RunnerResult};
use crate::services::log_files::LogTarget;
use crate::services::scratch::read_service_config;
use crate::strategy::RunOutcome;
use crate::traits::{Completion, LaunchSpec, OutputSink, Readiness};
use shared::{logging, process_debug, process_info, ServiceRole, UdfKind};

/// Discovery arguments used when no interpreted-test filter is given
pub const DISCOVERY_FILTER: &str = "discover -s ./python/ --pattern=Test*.py";

fn ensure_exists(field: &str, path: &Path) -> RunnerResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RunnerError::validation(
            field,
            format!("{} is invalid or not accessible", path.display()),
        ))
    }
}

pub fn validate_server_values(config: &RunConfiguration) -> RunnerResult<()> {
    if let Some(path) = &config.vdms_app_path {
        ensure_exists("vdms_app_path", path)?;
    }
    for path in config.service_config_files() {
        ensure_exists("config_files_for_vdms", path)?;
    }
    Ok(())
}

pub fn validate_compiled_binary(config: &RunConfiguration) -> RunnerResult<()> {
    match &config.googletest_path {
        Some(path) => ensure_exists("googletest_path", path),
        None => Ok(()),
    }
}

pub fn validate_object_store(config: &RunConfiguration) -> RunnerResult<()> {
    if is_blank(config.minio_username.as_deref()) {
        return Err(RunnerError::validation("minio_username", "an object-store username is required"));
    }
    if config.minio_password.is_none() {
        return Err(RunnerError::validation("minio_password", "an object-store password is required"));
    }
    if let Some(path) = &config.minio_app_path {
        ensure_exists("minio_app_path", path)?;
    }
    Ok(())
}

pub fn validate_graph_db(config: &RunConfiguration) -> RunnerResult<()> {
    if is_blank(config.neo4j_username.as_deref()) {
        return Err(RunnerError::validation("neo4j_username", "a graph-database username is required"));
    }
    if config.neo4j_password.is_none() {
        return Err(RunnerError::validation("neo4j_password", "a graph-database password is required"));
    }
    Ok(())
}

pub fn fill_test_filter(config: &mut RunConfiguration, default: &str) {
    if config.test_filter().is_none() {
        config.test_name = Some(default.to_string());
    }
}

/// Server binary plus the config list; an empty list falls back to `defaults`
pub fn fill_server_values(config: &mut RunConfiguration, cwd: &Path, defaults: &[&str]) -> RunnerResult<()> {
    let repo = config.repo()?.to_path_buf();
    fill_path(&mut config.vdms_app_path, || repo.join("build/vdms"));
    if config.service_config_files().is_empty() {
        config.config_files_for_vdms = Some(defaults.iter().map(|name| cwd.join(name)).collect());
    }
    Ok(())
}

pub fn fill_compiled_binary(config: &mut RunConfiguration) -> RunnerResult<()> {
    let repo = config.repo()?.to_path_buf();
    fill_path(&mut config.googletest_path, || repo.join("build/tests/unit_tests"));
    Ok(())
}

/// Object-store settings; the data dir always lives inside the scratch dir
pub fn fill_object_store(config: &mut RunConfiguration, env: &dyn EnvSource) -> RunnerResult<()> {
    let repo = config.repo()?.to_path_buf();
    let data_dir = config.scratch_dir()?.join(MINIO_TMP_DIR_NAME);
    fill_path(&mut config.minio_app_path, || repo.join("minio"));
    if config.minio_tmp_dir_name.as_ref().is_some_and(|dir| *dir != data_dir) {
        process_debug!(ServiceRole::ObjectStore, "Ignoring data dir outside scratch; using {}", data_dir.display());
    }
    config.minio_tmp_dir_name = Some(data_dir);
    fill_str(&mut config.minio_alias_name, || DEFAULT_MINIO_ALIAS.to_string());
    config.minio_port = Some(
        flag_env_default("minio_port", config.minio_port, ENV_MINIO_PORT, DEFAULT_MINIO_PORT, env)?.value,
    );
    config.minio_console_port = Some(
        flag_env_default(
            "minio_console_port",
            config.minio_console_port,
            ENV_MINIO_CONSOLE_PORT,
            DEFAULT_MINIO_CONSOLE_PORT,
            env,
        )?
        .value,
    );
    Ok(())
}

pub fn fill_graph_db(config: &mut RunConfiguration, env: &dyn EnvSource) -> RunnerResult<()> {
    config.neo4j_port =
        Some(flag_env_default("neo4j_port", config.neo4j_port, ENV_NEO4J_PORT, DEFAULT_NEO4J_PORT, env)?.value);
    let explicit = config.neo4j_endpoint.clone().filter(|e| !is_blank(Some(e.as_str())));
    config.neo4j_endpoint = Some(
        flag_env_default(
            "neo4j_endpoint",
            explicit,
            ENV_NEO4J_ENDPOINT,
            DEFAULT_NEO4J_ENDPOINT.to_string(),
            env,
        )?
        .value,
    );
    Ok(())
}

/// Run a one-shot step and fail the run on a non-zero exit
async fn run_step(ctx: &mut RunContext, spec: LaunchSpec, step: &str) -> RunnerResult<Completion> {
    let completion = ctx.run(spec).await?;
    completion.into_result(step)
}

async fn install_requirements(
    config: &RunConfiguration,
    ctx: &mut RunContext,
    requirements: PathBuf,
    target: LogTarget,
) -> RunnerResult<()> {
    let sink = ctx.log_sink(config, target)?;
    let spec = ctx
        .launch(ServiceRole::DependencyInstall, PYTHON)
        .args(["-m", "pip", "install", "-r"])
        .arg(requirements)
        .output(sink);
    run_step(ctx, spec, "requirements install").await?;
    Ok(())
}

async fn udf_local_port(settings: &Path) -> u16 {
    match read_service_config(settings).await {
        Ok(value) => value
            .get("port")
            .and_then(serde_json::Value::as_u64)
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_UDF_LOCAL_PORT),
        Err(e) => {
            process_debug!(
                ServiceRole::UdfDispatcher(UdfKind::Local),
                "Using port {}: {}",
                DEFAULT_UDF_LOCAL_PORT,
                e
            );
            DEFAULT_UDF_LOCAL_PORT
        }
    }
}

/// Start the remote HTTP and local queue UDF dispatchers
pub async fn start_udf_dispatchers(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<()> {
    let repo = config.repo()?.to_path_buf();
    let scratch = ctx.scratch().path.clone();

    install_requirements(config, ctx, repo.join("remote_function/requirements.txt"), LogTarget::UdfServer).await?;
    let remote_dir = repo.join("tests/remote_function_test");
    let sink = ctx.log_sink(config, LogTarget::UdfServer)?;
    let spec = ctx
        .launch(ServiceRole::UdfDispatcher(UdfKind::Remote), PYTHON)
        .arg(remote_dir.join("udf_server.py"))
        .arg(UDF_SERVER_PORT.to_string())
        .arg(remote_dir.join("functions"))
        .arg(&scratch)
        .output(sink);
    ctx.start(spec, Readiness::Tcp { port: UDF_SERVER_PORT }).await?;

    install_requirements(config, ctx, repo.join("user_defined_operations/requirements.txt"), LogTarget::UdfLocal)
        .await?;
    let local_dir = repo.join("tests/udf_test");
    let settings = local_dir.join("settings.json");
    let port = udf_local_port(&settings).await;
    let sink = ctx.log_sink(config, LogTarget::UdfLocal)?;
    let spec = ctx
        .launch(ServiceRole::UdfDispatcher(UdfKind::Local), PYTHON)
        .arg(local_dir.join("udf_local.py"))
        .arg(local_dir.join("functions"))
        .arg(settings)
        .arg(&scratch)
        .output(sink);
    ctx.start(spec, Readiness::Tcp { port }).await?;
    Ok(())
}

/// Run the TLS certificate preparation script
pub async fn prep_certs(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<()> {
    let script = config.repo()?.join("tests/tls_test/prep_certs.py");
    let sink = ctx.log_sink(config, LogTarget::Tls)?;
    let spec = ctx.launch(ServiceRole::CertPrep, PYTHON).arg(script).output(sink);
    run_step(ctx, spec, "certificate preparation").await?;
    Ok(())
}

/// Readiness port of each server config, checked before anything starts
///
/// Only the first config may leave `port` out; it then listens on the
/// server's built-in default. Two servers on one port would let the second
/// readiness check pass against the first.
async fn server_ports(configs: &[PathBuf]) -> RunnerResult<Vec<u16>> {
    let mut ports: Vec<u16> = Vec::with_capacity(configs.len());
    for (index, path) in configs.iter().enumerate() {
        let port = match read_service_config(path).await?.get("port").and_then(serde_json::Value::as_u64) {
            Some(port) => u16::try_from(port).map_err(|_| {
                RunnerError::validation("config_files_for_vdms", format!("{} has port {port} out of range", path.display()))
            })?,
            None if index == 0 => DEFAULT_SERVER_PORT,
            None => {
                return Err(RunnerError::validation(
                    "config_files_for_vdms",
                    format!("{} has no port and only the first server may use the default", path.display()),
                ));
            }
        };
        if ports.contains(&port) {
            return Err(RunnerError::validation(
                "config_files_for_vdms",
                format!("{} reuses port {port}", path.display()),
            ));
        }
        ports.push(port);
    }
    Ok(ports)
}

/// Start one server-under-test per materialized config file
pub async fn start_servers(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<()> {
    let server = required("vdms_app_path", &config.vdms_app_path)?.clone();
    let configs = ctx.service_configs().to_vec();
    let ports = server_ports(&configs).await?;
    for (index, (path, port)) in configs.iter().zip(ports).enumerate() {
        let sink = ctx.log_sink(config, LogTarget::Vdms)?;
        let spec = ctx
            .launch(ServiceRole::ServerUnderTest(index), &server)
            .arg("-cfg")
            .arg(path)
            .output(sink);
        ctx.start(spec, Readiness::Tcp { port }).await?;
    }
    Ok(())
}

/// Start the object-store emulator and create its alias and bucket
pub async fn start_object_store(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<()> {
    let binary = required("minio_app_path", &config.minio_app_path)?.clone();
    let data_dir = required("minio_tmp_dir_name", &config.minio_tmp_dir_name)?.clone();
    let port = *required("minio_port", &config.minio_port)?;
    let console_port = *required("minio_console_port", &config.minio_console_port)?;
    let alias = required("minio_alias_name", &config.minio_alias_name)?.clone();
    let username = required("minio_username", &config.minio_username)?.clone();
    let password = required("minio_password", &config.minio_password)?.expose().to_string();

    tokio::fs::create_dir_all(&data_dir)
        .await
        .map_err(|e| RunnerError::resource("create object-store data dir", &data_dir, e))?;

    let sink = ctx.log_sink(config, LogTarget::Minio)?;
    let spec = ctx
        .launch(ServiceRole::ObjectStore, &binary)
        .arg("server")
        .arg(&data_dir)
        .args(["--address".to_string(), format!(":{port}")])
        .args(["--console-address".to_string(), format!(":{console_port}")])
        .output(sink);
    let url = format!("http://127.0.0.1:{port}/minio/health/live");
    ctx.start(spec, Readiness::Http { url }).await?;

    let sink = ctx.log_sink(config, LogTarget::Minio)?;
    let spec = ctx
        .launch(ServiceRole::ObjectStoreClient, MINIO_CLIENT)
        .args(["alias".to_string(), "set".to_string(), format!("{alias}/")])
        .arg(format!("http://localhost:{port}"))
        .arg(username)
        .secret_arg(password)
        .output(sink);
    run_step(ctx, spec, "object-store alias setup").await?;

    let sink = ctx.log_sink(config, LogTarget::Minio)?;
    let spec = ctx
        .launch(ServiceRole::ObjectStoreClient, MINIO_CLIENT)
        .arg("mb")
        .arg(format!("{alias}/{MINIO_BUCKET}"))
        .output(sink);
    run_step(ctx, spec, "object-store bucket creation").await?;
    logging::log_step_done(&ServiceRole::ObjectStore, &format!("bucket {alias}/{MINIO_BUCKET} ready"));
    Ok(())
}

/// Make the graph database reachable for every child started afterwards
pub fn export_graph_db_env(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<()> {
    let port = *required("neo4j_port", &config.neo4j_port)?;
    let username = required("neo4j_username", &config.neo4j_username)?.clone();
    let password = required("neo4j_password", &config.neo4j_password)?.expose().to_string();
    let endpoint = required("neo4j_endpoint", &config.neo4j_endpoint)?.clone();

    ctx.set_env("NEO_TEST_PORT", port.to_string());
    ctx.set_env("NEO4J_USER", username);
    ctx.set_secret_env("NEO4J_PASS", password);
    ctx.set_env("NEO4J_ENDPOINT", endpoint.clone());
    process_info!(ServiceRole::GraphDb, "Tests will use the graph database at {}", endpoint);
    Ok(())
}

/// Extend the interpreter search path with the client and test helpers
pub fn set_interpreter_path(
    config: &RunConfiguration,
    ctx: &mut RunContext,
    inherited: Option<String>,
) -> RunnerResult<()> {
    let repo = config.repo()?;
    let client = repo.join("client/python");
    if !client.exists() {
        return Err(RunnerError::resource(
            "locate Python client",
            &client,
            "path is invalid or not accessible",
        ));
    }
    let mut entries: Vec<PathBuf> = inherited
        .filter(|existing| !existing.is_empty())
        .map(|existing| std::env::split_paths(&existing).collect())
        .unwrap_or_default();
    entries.push(client);
    entries.push(repo.join("tests/python"));
    let joined = std::env::join_paths(&entries)
        .map_err(|e| RunnerError::resource("build PYTHONPATH", repo, e))?;
    ctx.set_env("PYTHONPATH", joined.to_string_lossy().into_owned());
    Ok(())
}

/// Run the googletest binary with the resolved filter
pub async fn run_compiled_binary(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
    let binary = required("googletest_path", &config.googletest_path)?.clone();
    let filter = config
        .test_filter()
        .ok_or_else(|| RunnerError::validation("test_name", "no value after default resolution"))?
        .to_string();
    if !config.should_run() {
        return Ok(RunOutcome::ServicesOnly);
    }

    let mut spec = ctx
        .launch(ServiceRole::TestDriver, &binary)
        .arg(format!("--gtest_filter={filter}"));
    if config.stop_on_failure() {
        spec = spec.arg(STOP_ON_FAILURE_FLAG);
    }
    run_suite(config, ctx, spec, "googletest run").await
}

/// Run a suite with captured output, keep a copy in the tests log and echo it
///
/// Output is echoed and logged before the exit status is checked.
async fn run_suite(
    config: &RunConfiguration,
    ctx: &mut RunContext,
    spec: LaunchSpec,
    step: &str,
) -> RunnerResult<RunOutcome> {
    let completion = ctx.run(spec.output(OutputSink::Capture)).await?;
    ctx.record_output(config, LogTarget::Tests, &completion)?;
    if let Some(stdout) = completion.stdout.as_deref() {
        print!("{stdout}");
    }
    if let Some(stderr) = completion.stderr.as_deref() {
        eprint!("{stderr}");
    }
    completion.into_result(step)?;
    logging::log_suite_passed(step);
    Ok(RunOutcome::Completed)
}

/// Run the Python suite under coverage, echoing and logging its output
pub async fn run_interpreted_suite(config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
    let repo = config.repo()?.to_path_buf();
    let filter = config
        .test_filter()
        .ok_or_else(|| RunnerError::validation("test_name", "no value after default resolution"))?
        .to_string();
    if !config.should_run() {
        return Ok(RunOutcome::ServicesOnly);
    }
    process_info!(ServiceRole::TestDriver, "Test filter: {}", filter);

    let repo_text = repo.display();
    let mut spec = ctx
        .launch(ServiceRole::TestDriver, PYTHON)
        .args(["-m", "coverage", "run", "-a"])
        .arg(format!("--include={repo_text}/*"))
        .arg(format!(
            "--omit={repo_text}/client/python/vdms/queryMessage_pb2.py,{repo_text}/tests/*"
        ))
        .args(["-m", "unittest"]);
    spec = if filter == DISCOVERY_FILTER {
        spec.args(filter.split_whitespace())
    } else {
        spec.arg(filter)
    };
    let spec = spec.arg("-v").current_dir(repo.join("tests"));
    run_suite(config, ctx, spec, "Python test suite").await
}
