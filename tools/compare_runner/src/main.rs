use landed_cost_core::audit::log::AuditLog;
use landed_cost_core::comparison::model::ComparisonRequest;
use landed_cost_core::comparison::render::render_comparison_csv;
use landed_cost_core::comparison::workflow::ComparisonOrchestrator;
use landed_cost_core::config::OracleConfig;
use landed_cost_core::oracle::http::HttpDutyOracle;
use landed_cost_core::oracle::interface::DutyOracle;
use landed_cost_core::policy::egress::EgressPolicy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: compare_runner <request.json> [--csv <out.csv>] [--audit <audit.ndjson>] [--offline]";

struct Args {
    request: PathBuf,
    csv_out: Option<PathBuf>,
    audit_log: Option<PathBuf>,
    offline: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut it = std::env::args().skip(1);
    let mut request = None;
    let mut csv_out = None;
    let mut audit_log = None;
    let mut offline = false;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--csv" => csv_out = Some(PathBuf::from(it.next().ok_or("--csv needs a path")?)),
            "--audit" => audit_log = Some(PathBuf::from(it.next().ok_or("--audit needs a path")?)),
            "--offline" => offline = true,
            other if other.starts_with("--") => return Err(format!("unknown flag: {}", other)),
            other => {
                if request.replace(PathBuf::from(other)).is_some() {
                    return Err("only one request file may be given".to_string());
                }
            }
        }
    }
    Ok(Args {
        request: request.ok_or("missing request file")?,
        csv_out,
        audit_log,
        offline,
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("compare_runner error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let request_bytes = std::fs::read(&args.request)
        .map_err(|e| format!("reading {}: {}", args.request.display(), e))?;
    let request: ComparisonRequest =
        serde_json::from_slice(&request_bytes).map_err(|e| format!("invalid request: {}", e))?;

    let config = OracleConfig::from_env().map_err(|e| e.to_string())?;
    let policy = if args.offline {
        EgressPolicy::offline()
    } else {
        EgressPolicy::allow_endpoints(&[config.api_base_url.as_str()]).map_err(|e| e.to_string())?
    };
    tracing::info!(endpoint = %config.quote_endpoint(), offline = args.offline, "oracle configured");
    let oracle = HttpDutyOracle::new(config, policy.clone()).map_err(|e| e.to_string())?;
    tracing::debug!(endpoint = oracle.endpoint(), "http oracle ready");

    let mut audit = match &args.audit_log {
        Some(p) => Some(AuditLog::open_or_create(p).map_err(|e| e.to_string())?),
        None => None,
    };
    let mut orchestrator = ComparisonOrchestrator::new(&oracle, &policy);
    if let Some(a) = audit.as_mut() {
        orchestrator = orchestrator.with_audit(a);
    }
    let result = orchestrator.compare(&request).map_err(|e| e.to_string())?;

    if let Some(out) = &args.csv_out {
        let csv = render_comparison_csv(&result).map_err(|e| e.to_string())?;
        std::fs::write(out, csv).map_err(|e| format!("writing {}: {}", out.display(), e))?;
    }
    let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}
