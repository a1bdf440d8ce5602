//! Two-stage metric comparison

use crate::config::ComparatorConfig;
use crate::error::ComparatorError;
use crate::parser::parse_result;
use crate::prompt::{format_messages, ComparePromptBuilder};
use crate::report::{ComparisonInput, ComparisonOutcome, ComplianceRecord, ComplianceReport};
use crate::workflow::Stage;
use chrono::Utc;
use covenant_domain::traits::LlmProvider;
use covenant_domain::{
    fmt_num, ActualMetric, ComparisonResult, CompletionRequest, Condition, Message, MetricValue,
    TargetMetric,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Compares actual readings with contractual targets through an LLM
pub struct MetricComparator<L> {
    llm: Arc<L>,
    config: ComparatorConfig,
}

impl<L> Clone for MetricComparator<L> {
    fn clone(&self) -> Self {
        Self {
            llm: Arc::clone(&self.llm),
            config: self.config.clone(),
        }
    }
}

impl<L: LlmProvider + 'static> MetricComparator<L> {
    /// Create a comparator
    pub fn new(llm: Arc<L>, config: ComparatorConfig) -> Result<Self, ComparatorError> {
        config.validate().map_err(ComparatorError::Config)?;
        Ok(Self { llm, config })
    }

    /// The active configuration
    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    async fn call(&self, messages: Vec<Message>, json: bool) -> Result<String, ComparatorError> {
        let mut request =
            CompletionRequest::new(messages).with_temperature(self.config.temperature);
        if json {
            request = request.json();
        }
        let reply = self
            .llm
            .complete(request)
            .await
            .map_err(|e| ComparatorError::Llm(e.to_string()))?;
        Ok(reply.content.unwrap_or_default())
    }

    /// Compare stage: ask the model to evaluate the condition in prose
    pub async fn compare(
        &self,
        actual: &ActualMetric,
        target: &MetricValue,
        condition: Condition,
    ) -> Result<String, ComparatorError> {
        let messages = ComparePromptBuilder::new(actual, target, condition).build();
        let text = self.call(messages, false).await?;
        debug!("Compare reply: {} chars", text.len());
        if text.trim().is_empty() {
            return Err(ComparatorError::MalformedOutput(
                "empty comparison".to_string(),
            ));
        }
        Ok(text)
    }

    /// Format stage: force a written comparison into a [`ComparisonResult`]
    pub async fn format(&self, raw_text: &str) -> Result<ComparisonResult, ComparatorError> {
        let text = self.call(format_messages(raw_text), true).await?;
        debug!("Format reply: {} chars", text.len());
        parse_result(&text).map_err(ComparatorError::MalformedOutput)
    }

    /// Run the full workflow for one reading and its target
    ///
    /// Malformed output re-runs both stages until `max_attempts` is spent.
    /// Provider errors end the workflow at once.
    pub async fn evaluate(
        &self,
        actual: &ActualMetric,
        target: &TargetMetric,
    ) -> Result<ComparisonResult, ComparatorError> {
        if !target.metric_value.has_threshold() {
            return Err(ComparatorError::InvalidInput(
                "target has neither min_value nor max_value".to_string(),
            ));
        }
        if !actual.value.is_finite() {
            return Err(ComparatorError::InvalidInput(format!(
                "actual value {} is not a finite number",
                actual.value
            )));
        }
        if !actual.unit_matches(&target.metric_value) {
            warn!(
                "Unit mismatch: actual '{}' vs target '{}'",
                actual.data_type, target.metric_value.data_type
            );
        }

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_attempts {
            match self.run_once(actual, target).await {
                Ok(result) => return Ok(self.reconcile(result, actual, target)),
                Err(ComparatorError::MalformedOutput(reason)) => {
                    warn!(
                        "Malformed comparison output (attempt {}/{}): {}",
                        attempt, self.config.max_attempts, reason
                    );
                    last_error = reason;
                }
                Err(e) => return Err(e),
            }
        }
        Err(ComparatorError::MalformedOutput(format!(
            "after {} attempts: {}",
            self.config.max_attempts, last_error
        )))
    }

    async fn run_once(
        &self,
        actual: &ActualMetric,
        target: &TargetMetric,
    ) -> Result<ComparisonResult, ComparatorError> {
        let mut stage = Stage::Start;
        let mut raw = String::new();
        let mut result = None;
        while !stage.is_terminal() {
            stage = stage.next();
            debug!("Comparison stage: {}", stage);
            match stage {
                Stage::Compare => {
                    raw = self
                        .compare(actual, &target.metric_value, target.condition)
                        .await?
                }
                Stage::Format => result = Some(self.format(&raw).await?),
                Stage::Start | Stage::Done => {}
            }
        }
        result.ok_or_else(|| ComparatorError::MalformedOutput("no result produced".to_string()))
    }

    /// Apply the literal verdict and trend over the model's answer
    fn reconcile(
        &self,
        mut result: ComparisonResult,
        actual: &ActualMetric,
        target: &TargetMetric,
    ) -> ComparisonResult {
        let condition = target.condition;
        let value = actual.value;
        let bounds = &target.metric_value;

        if self.config.enforce_literal_evaluation {
            if let Some(literal) = condition.evaluate(value, bounds) {
                if literal != result.is_compliant {
                    warn!(
                        "Model verdict {} contradicts literal evaluation {} for {}; using literal",
                        result.is_compliant,
                        literal,
                        condition.statement(value, bounds).unwrap_or_default()
                    );
                    result.is_compliant = literal;
                    if literal {
                        result.reason = None;
                    }
                }
            }
            if let Some(trend) = condition.trend(value, bounds) {
                if trend != result.remark {
                    warn!(
                        "Model remark '{}' contradicts trend '{}'; using trend",
                        result.remark, trend
                    );
                    result.remark = trend;
                }
            }
        }

        if !result.is_compliant && result.reason.is_none() {
            result.reason = Some(match condition.statement(value, bounds) {
                Some(statement) => format!("{} does not hold", statement),
                None => format!(
                    "actual value {} {} does not meet the target",
                    fmt_num(value),
                    actual.data_type
                ),
            });
        }
        result
    }

    /// Compare a batch of metrics with bounded parallelism
    ///
    /// Records follow input order. A failing metric is reported as
    /// [`ComparisonOutcome::Failed`] and never aborts the batch.
    pub async fn compare_batch(&self, inputs: Vec<ComparisonInput>) -> ComplianceReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, input) in inputs.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let comparator = self.clone();
            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let result = comparator.evaluate(&input.actual, &input.target).await;
                (index, result)
            });
        }

        let mut outcomes: Vec<Option<ComparisonOutcome>> = inputs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(result))) => outcomes[index] = Some(ComparisonOutcome::Compared(result)),
                Ok((index, Err(e))) => {
                    warn!("Comparison of '{}' failed: {}", inputs[index].metric, e);
                    outcomes[index] = Some(ComparisonOutcome::Failed {
                        reason: e.to_string(),
                    });
                }
                Err(e) => warn!("Comparison task ended abnormally: {}", e),
            }
        }

        let records: Vec<ComplianceRecord> = inputs
            .into_iter()
            .zip(outcomes)
            .map(|(input, outcome)| ComplianceRecord {
                metric: input.metric,
                actual: input.actual,
                target: input.target,
                outcome: outcome.unwrap_or_else(|| ComparisonOutcome::Failed {
                    reason: "comparison task did not complete".to_string(),
                }),
            })
            .collect();

        let report = ComplianceReport {
            records,
            generated_at: Utc::now(),
        };
        info!(
            "Compared {} metrics: {} compliant, {} non-compliant, {} failed",
            report.records.len(),
            report.compliant_count(),
            report.non_compliant_count(),
            report.failed_count()
        );
        report
    }
}
