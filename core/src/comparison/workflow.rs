use super::aggregate::compute_totals;
use super::model::{
    ComparisonRequest, ComparisonResult, OracleTraffic, VendorInput, VendorResult, VendorStatus,
};
use super::normalize::{normalize_outcome, VendorOutcome};
use super::rank::assign_ranks;
use super::schema::DutySchema;
use crate::audit::event::{Actor, AuditEvent};
use crate::audit::log::AuditLog;
use crate::determinism::ids::{comparison_id_ulid, sha256_hex};
use crate::error::{CoreError, CoreResult};
use crate::oracle::interface::{
    DutyOracle, FailureCategory, OracleExchange, OracleFailure, OracleRequest,
};
use crate::policy::egress::{destination_details, EgressDecision, EgressPolicy};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;

/// Drives one comparison: fan out one oracle call per complete vendor, then normalize, unify,
/// aggregate and rank.
pub struct ComparisonOrchestrator<'a, O: DutyOracle> {
    oracle: &'a O,
    policy: &'a EgressPolicy,
    audit: Option<&'a mut AuditLog>,
}

impl<'a, O: DutyOracle> ComparisonOrchestrator<'a, O> {
    pub fn new(oracle: &'a O, policy: &'a EgressPolicy) -> Self {
        Self {
            oracle,
            policy,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: &'a mut AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn compare(&mut self, request: &ComparisonRequest) -> CoreResult<ComparisonResult> {
        request.validate()?;
        let comparison_id = comparison_id_ulid();
        let vendors = request.complete_vendors();

        self.emit(
            &comparison_id,
            "COMPARISON_STARTED",
            Actor::User,
            json!({
                "vendor_entries": request.vendors.len(),
                "complete_vendors": vendors.len(),
                "quantity": request.quantity,
                "request_hash_sha256": sha256_hex(&serde_json::to_vec(request)?),
            }),
        )?;
        for (idx, v) in request.vendors.iter().enumerate() {
            if !v.is_complete() {
                tracing::debug!(vendor_id = idx + 1, "skipping incomplete vendor entry");
                self.emit(
                    &comparison_id,
                    "VENDOR_SKIPPED",
                    Actor::System,
                    json!({"vendor_id": idx + 1, "reason": "INCOMPLETE_INPUT"}),
                )?;
            }
        }

        if vendors.is_empty() {
            tracing::info!(%comparison_id, "no complete vendors; nothing to compare");
            return Ok(ComparisonResult::empty(comparison_id, request.quantity));
        }

        self.authorize_endpoint(&comparison_id)?;

        let oracle_requests: Vec<OracleRequest> = vendors
            .iter()
            .map(|(id, v)| oracle_request(*id, v, request))
            .collect();
        let exchanges = fan_out(self.oracle, &oracle_requests);

        let mut outcomes: Vec<VendorOutcome> = Vec::with_capacity(exchanges.len());
        let mut traffic = BTreeMap::new();
        for ((vendor_id, _), (exchange, duration_ms)) in vendors.iter().zip(exchanges) {
            let outcome = normalize_outcome(&exchange.outcome);
            self.record_call(&comparison_id, *vendor_id, &exchange, &outcome, duration_ms)?;
            traffic.insert(
                *vendor_id,
                OracleTraffic {
                    response: exchange.outcome.as_ref().ok().cloned(),
                    error: outcome.as_ref().err().cloned(),
                    request_payload: exchange.request_payload,
                    duration_ms,
                },
            );
            outcomes.push(outcome);
        }

        let (schema, vendor_results) = build_vendor_results(request.quantity, &vendors, outcomes);
        let result = ComparisonResult {
            comparison_id,
            quantity: request.quantity,
            schema,
            vendors: vendor_results,
            traffic,
        };

        let failed = result
            .vendors
            .iter()
            .filter(|v| !v.status.is_success())
            .count();
        tracing::info!(
            comparison_id = %result.comparison_id,
            vendors = result.vendors.len(),
            failed,
            duty_columns = result.schema.len(),
            "comparison complete"
        );
        self.emit(
            &result.comparison_id,
            "COMPARISON_COMPLETED",
            Actor::System,
            json!({
                "vendors_succeeded": result.vendors.len() - failed,
                "vendors_failed": failed,
                "schema_len": result.schema.len(),
                "cheapest_vendor_ids": result.cheapest_vendor_ids(),
            }),
        )?;
        Ok(result)
    }

    // A blocked or unparseable endpoint stops the comparison before any vendor is quoted.
    fn authorize_endpoint(&mut self, comparison_id: &str) -> CoreResult<()> {
        let oracle = self.oracle;
        let endpoint = oracle.endpoint();
        let url = Url::parse(endpoint).map_err(|e| {
            CoreError::Config(format!("invalid oracle endpoint {}: {}", endpoint, e))
        })?;
        match self.policy.decide(&url) {
            EgressDecision::Allowed { allowlist_rule_id } => self.emit(
                comparison_id,
                "EGRESS_REQUEST_ALLOWED",
                Actor::System,
                json!({
                    "destination": destination_details(&url),
                    "allowlist_rule_id": allowlist_rule_id,
                }),
            ),
            EgressDecision::Blocked { reason } => {
                tracing::warn!(%comparison_id, %reason, "oracle endpoint blocked by egress policy");
                self.emit(
                    comparison_id,
                    "EGRESS_REQUEST_BLOCKED",
                    Actor::System,
                    json!({
                        "destination": destination_details(&url),
                        "block_reason": reason,
                    }),
                )?;
                Err(CoreError::PolicyBlocked(format!(
                    "oracle endpoint {} not permitted: {}",
                    endpoint, reason
                )))
            }
        }
    }

    fn record_call(
        &mut self,
        comparison_id: &str,
        vendor_id: u32,
        exchange: &OracleExchange,
        outcome: &VendorOutcome,
        duration_ms: u64,
    ) -> CoreResult<()> {
        let request_hash = sha256_hex(&serde_json::to_vec(&exchange.request_payload)?);
        match outcome {
            Ok(duties) => {
                tracing::debug!(vendor_id, duties = duties.len(), duration_ms, "oracle quote ok");
                let response_hash = match &exchange.outcome {
                    Ok(body) => sha256_hex(&serde_json::to_vec(body)?),
                    Err(_) => String::new(),
                };
                self.emit(
                    comparison_id,
                    "ORACLE_CALL_COMPLETED",
                    Actor::System,
                    json!({
                        "vendor_id": vendor_id,
                        "request_hash_sha256": request_hash,
                        "response_hash_sha256": response_hash,
                        "duty_count": duties.len(),
                        "duration_ms": duration_ms,
                    }),
                )
            }
            Err(failure) => {
                tracing::warn!(vendor_id, error = %failure, "oracle quote failed");
                self.emit(
                    comparison_id,
                    "ORACLE_CALL_FAILED",
                    Actor::System,
                    json!({
                        "vendor_id": vendor_id,
                        "request_hash_sha256": request_hash,
                        "error_category": failure.category.as_str(),
                        "error_message": failure.message,
                    }),
                )
            }
        }
    }

    fn emit(
        &mut self,
        comparison_id: &str,
        event_type: &str,
        actor: Actor,
        details: serde_json::Value,
    ) -> CoreResult<()> {
        if let Some(audit) = self.audit.as_deref_mut() {
            audit.append(AuditEvent::new(comparison_id, event_type, actor, details))?;
        }
        Ok(())
    }
}

fn oracle_request(vendor_id: u32, v: &VendorInput, request: &ComparisonRequest) -> OracleRequest {
    OracleRequest {
        vendor_id,
        ship_from_country: v.country.as_deref().unwrap_or_default().trim().to_string(),
        country_of_origin: v.coo.as_deref().unwrap_or_default().trim().to_string(),
        destination_country: request.import_country.clone(),
        unit_cost: v.unit_cost.unwrap_or_default(),
        quantity: request.quantity,
        description: request.description.clone(),
        hs_code: request.hs_code.clone(),
        spi_applicable: v.spi_applicable,
    }
}

/// Issues every request on its own thread. Each thread owns one result slot, and slots are
/// read back in request order, so completion order never leaks into the result.
fn fan_out<O: DutyOracle>(oracle: &O, requests: &[OracleRequest]) -> Vec<(OracleExchange, u64)> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|req| {
                scope.spawn(move || {
                    let started = Instant::now();
                    let exchange = oracle.quote(req);
                    (exchange, started.elapsed().as_millis() as u64)
                })
            })
            .collect();
        handles
            .into_iter()
            .zip(requests)
            .map(|(h, req)| {
                h.join().unwrap_or_else(|_| {
                    (
                        OracleExchange {
                            request_payload: serde_json::to_value(req)
                                .unwrap_or(serde_json::Value::Null),
                            outcome: Err(OracleFailure::new(
                                FailureCategory::TRANSPORT,
                                "oracle call panicked",
                            )),
                        },
                        0,
                    )
                })
            })
            .collect()
    })
}

/// Pure tail of the pipeline: unify successful duty lists, project every vendor onto the
/// schema, total the successful ones and rank them.
pub fn build_vendor_results(
    quantity: u32,
    vendors: &[(u32, &VendorInput)],
    outcomes: Vec<VendorOutcome>,
) -> (DutySchema, Vec<VendorResult>) {
    let schema = DutySchema::unify(
        outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .map(|duties| duties.as_slice()),
    );

    let mut results: Vec<VendorResult> = vendors
        .iter()
        .zip(outcomes)
        .map(|((vendor_id, input), outcome)| {
            let unit_cost = input.unit_cost.unwrap_or_default();
            let (duties, totals, status) = match outcome {
                Ok(raw) => {
                    let row = schema.project(&raw);
                    let totals = compute_totals(quantity, unit_cost, &row);
                    (row, Some(totals), VendorStatus::Success)
                }
                Err(failure) => (schema.project_failed(), None, VendorStatus::Failed(failure)),
            };
            VendorResult {
                vendor_id: *vendor_id,
                name: input.name.clone(),
                country: input.country.clone().unwrap_or_default(),
                coo: input.coo.clone().unwrap_or_default(),
                unit_cost,
                duties,
                totals,
                status,
                color_rank: None,
                is_cheapest: false,
            }
        })
        .collect();

    let costs: Vec<Option<f64>> = results
        .iter()
        .map(|r| r.totals.map(|t| t.total_cost))
        .collect();
    for (result, ranking) in results.iter_mut().zip(assign_ranks(&costs)) {
        if let Some(ranking) = ranking {
            result.color_rank = Some(ranking.color_rank);
            result.is_cheapest = ranking.is_cheapest;
        }
    }

    (schema, results)
}
