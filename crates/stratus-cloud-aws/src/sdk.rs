//! API clients backed by the AWS SDK

use crate::alarm::api::{
    CloudWatchApi, Dimension, Metric, MetricAlarm, MetricDataQuery, MetricStatRecord,
    PutMetricAlarmInput,
};
use crate::domain::api::{DomainDetail, DomainsApi, OperationDetail, OperationStatus};
use crate::domain::model::{ContactDetail, Nameserver};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use aws_sdk_cloudwatch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatch::types as cw;
use aws_sdk_route53domains::types as r53d;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use stratus_config::StratusConfig;

/// Load SDK configuration, honoring the configured region and profile
pub async fn load_sdk_config(config: &StratusConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    let sdk_config = loader.load().await;
    tracing::debug!(
        "Loaded AWS SDK config (region: {:?})",
        sdk_config.region().map(|r| r.as_ref())
    );
    sdk_config
}

/// Map an SDK error onto [`ApiError`]
///
/// Route 53 Domains reports an unknown domain as `InvalidInput` with a
/// "not found" message.
fn api_error<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) => {
            let message = err.message().unwrap_or_default().to_string();
            if code == "ResourceNotFound" || (code == "InvalidInput" && message.contains("not found"))
            {
                ApiError::NotFound(message)
            } else {
                ApiError::rejected(code, message)
            }
        }
        None => ApiError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

fn build_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::rejected("BuildError", err.to_string())
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

// ============================================================================
// CloudWatch
// ============================================================================

pub struct SdkCloudWatch {
    client: aws_sdk_cloudwatch::Client,
}

impl SdkCloudWatch {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatch::Client::new(sdk_config),
        }
    }
}

fn to_sdk_dimensions(dimensions: &[Dimension]) -> ApiResult<Vec<cw::Dimension>> {
    dimensions
        .iter()
        .map(|d| {
            cw::Dimension::builder()
                .name(&d.name)
                .value(&d.value)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn from_sdk_dimensions(dimensions: &[cw::Dimension]) -> Vec<Dimension> {
    dimensions
        .iter()
        .map(|d| Dimension {
            name: d.name().to_string(),
            value: d.value().to_string(),
        })
        .collect()
}

fn to_sdk_query(query: &MetricDataQuery) -> ApiResult<cw::MetricDataQuery> {
    let metric_stat = match &query.metric_stat {
        Some(stat) => {
            let metric = cw::Metric::builder()
                .set_metric_name(stat.metric.metric_name.clone())
                .set_namespace(stat.metric.namespace.clone())
                .set_dimensions(non_empty(to_sdk_dimensions(&stat.metric.dimensions)?))
                .build();
            Some(
                cw::MetricStat::builder()
                    .metric(metric)
                    .period(stat.period.unwrap_or_default())
                    .stat(stat.stat.clone().unwrap_or_default())
                    .set_unit(stat.unit.as_deref().map(cw::StandardUnit::from))
                    .build()
                    .map_err(build_error)?,
            )
        }
        None => None,
    };

    cw::MetricDataQuery::builder()
        .id(&query.id)
        .set_expression(query.expression.clone())
        .set_label(query.label.clone())
        .set_return_data(query.return_data)
        .set_metric_stat(metric_stat)
        .build()
        .map_err(build_error)
}

fn from_sdk_query(query: &cw::MetricDataQuery) -> MetricDataQuery {
    MetricDataQuery {
        id: query.id().to_string(),
        expression: query.expression().map(str::to_string),
        label: query.label().map(str::to_string),
        return_data: query.return_data(),
        metric_stat: query.metric_stat().map(|stat| MetricStatRecord {
            metric: stat
                .metric()
                .map(|m| Metric {
                    metric_name: m.metric_name().map(str::to_string),
                    namespace: m.namespace().map(str::to_string),
                    dimensions: from_sdk_dimensions(m.dimensions()),
                })
                .unwrap_or_default(),
            period: Some(stat.period()),
            stat: Some(stat.stat().to_string()),
            unit: stat.unit().map(|u| u.as_str().to_string()),
        }),
    }
}

fn from_sdk_alarm(alarm: &cw::MetricAlarm) -> MetricAlarm {
    MetricAlarm {
        alarm_name: alarm.alarm_name().unwrap_or_default().to_string(),
        alarm_arn: alarm.alarm_arn().map(str::to_string),
        comparison_operator: alarm.comparison_operator().map(|c| c.as_str().to_string()),
        evaluation_periods: alarm.evaluation_periods(),
        threshold: alarm.threshold(),
        actions_enabled: alarm.actions_enabled(),
        alarm_actions: alarm.alarm_actions().to_vec(),
        ok_actions: alarm.ok_actions().to_vec(),
        insufficient_data_actions: alarm.insufficient_data_actions().to_vec(),
        alarm_description: alarm.alarm_description().map(str::to_string),
        datapoints_to_alarm: alarm.datapoints_to_alarm(),
        metric_name: alarm.metric_name().map(str::to_string),
        namespace: alarm.namespace().map(str::to_string),
        period: alarm.period(),
        statistic: alarm.statistic().map(|s| s.as_str().to_string()),
        extended_statistic: alarm.extended_statistic().map(str::to_string),
        dimensions: from_sdk_dimensions(alarm.dimensions()),
        metrics: alarm.metrics().iter().map(from_sdk_query).collect(),
        unit: alarm.unit().map(|u| u.as_str().to_string()),
        treat_missing_data: alarm.treat_missing_data().map(str::to_string),
        evaluate_low_sample_count_percentile: alarm
            .evaluate_low_sample_count_percentile()
            .map(str::to_string),
        state_value: alarm.state_value().map(|s| s.as_str().to_string()),
    }
}

#[async_trait]
impl CloudWatchApi for SdkCloudWatch {
    async fn put_metric_alarm(&self, input: PutMetricAlarmInput) -> ApiResult<()> {
        let metrics = input
            .metrics
            .iter()
            .map(to_sdk_query)
            .collect::<ApiResult<Vec<_>>>()?;

        self.client
            .put_metric_alarm()
            .alarm_name(input.alarm_name)
            .comparison_operator(cw::ComparisonOperator::from(
                input.comparison_operator.as_str(),
            ))
            .evaluation_periods(input.evaluation_periods)
            .threshold(input.threshold)
            .set_actions_enabled(input.actions_enabled)
            .set_alarm_actions(non_empty(input.alarm_actions))
            .set_ok_actions(non_empty(input.ok_actions))
            .set_insufficient_data_actions(non_empty(input.insufficient_data_actions))
            .set_alarm_description(input.alarm_description)
            .set_datapoints_to_alarm(input.datapoints_to_alarm)
            .set_metric_name(input.metric_name)
            .set_namespace(input.namespace)
            .set_period(input.period)
            .set_statistic(input.statistic.as_deref().map(cw::Statistic::from))
            .set_extended_statistic(input.extended_statistic)
            .set_dimensions(non_empty(to_sdk_dimensions(&input.dimensions)?))
            .set_metrics(non_empty(metrics))
            .set_unit(input.unit.as_deref().map(cw::StandardUnit::from))
            .set_treat_missing_data(input.treat_missing_data)
            .set_evaluate_low_sample_count_percentile(input.evaluate_low_sample_count_percentile)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn describe_alarms(&self, alarm_names: &[String]) -> ApiResult<Vec<MetricAlarm>> {
        let mut alarms = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .describe_alarms()
                .set_alarm_names(Some(alarm_names.to_vec()))
                .alarm_types(cw::AlarmType::MetricAlarm)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(api_error)?;

            alarms.extend(output.metric_alarms().iter().map(from_sdk_alarm));
            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(alarms)
    }

    async fn delete_alarms(&self, alarm_names: &[String]) -> ApiResult<()> {
        self.client
            .delete_alarms()
            .set_alarm_names(Some(alarm_names.to_vec()))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }
}

// ============================================================================
// Route 53 Domains
// ============================================================================

pub struct SdkDomains {
    client: aws_sdk_route53domains::Client,
}

impl SdkDomains {
    /// Route 53 Domains is only served from us-east-1; the region is forced
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        let config = aws_sdk_route53domains::config::Builder::from(sdk_config)
            .region(aws_config::Region::from_static("us-east-1"))
            .build();
        Self {
            client: aws_sdk_route53domains::Client::from_conf(config),
        }
    }
}

fn to_chrono(date: Option<&aws_sdk_route53domains::primitives::DateTime>) -> Option<DateTime<Utc>> {
    date.and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
}

fn to_sdk_contact(contact: &ContactDetail) -> ApiResult<r53d::ContactDetail> {
    let extra_params = contact
        .extra_params
        .iter()
        .map(|(name, value)| {
            r53d::ExtraParam::builder()
                .name(r53d::ExtraParamName::from(name.as_str()))
                .value(value)
                .build()
                .map_err(build_error)
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(r53d::ContactDetail::builder()
        .set_first_name(contact.first_name.clone())
        .set_last_name(contact.last_name.clone())
        .set_contact_type(contact.contact_type.as_deref().map(r53d::ContactType::from))
        .set_organization_name(contact.organization_name.clone())
        .set_address_line1(contact.address_line_1.clone())
        .set_address_line2(contact.address_line_2.clone())
        .set_city(contact.city.clone())
        .set_state(contact.state.clone())
        .set_country_code(contact.country_code.as_deref().map(r53d::CountryCode::from))
        .set_zip_code(contact.zip_code.clone())
        .set_phone_number(contact.phone_number.clone())
        .set_email(contact.email.clone())
        .set_fax(contact.fax.clone())
        .set_extra_params(non_empty(extra_params))
        .build())
}

fn from_sdk_contact(contact: &r53d::ContactDetail) -> ContactDetail {
    ContactDetail {
        first_name: contact.first_name().map(str::to_string),
        last_name: contact.last_name().map(str::to_string),
        contact_type: contact.contact_type().map(|t| t.as_str().to_string()),
        organization_name: contact.organization_name().map(str::to_string),
        address_line_1: contact.address_line1().map(str::to_string),
        address_line_2: contact.address_line2().map(str::to_string),
        city: contact.city().map(str::to_string),
        state: contact.state().map(str::to_string),
        country_code: contact.country_code().map(|c| c.as_str().to_string()),
        zip_code: contact.zip_code().map(str::to_string),
        phone_number: contact.phone_number().map(str::to_string),
        email: contact.email().map(str::to_string),
        fax: contact.fax().map(str::to_string),
        extra_params: contact
            .extra_params()
            .iter()
            .map(|p| (p.name().as_str().to_string(), p.value().to_string()))
            .collect(),
    }
}

fn to_sdk_nameserver(ns: &Nameserver) -> ApiResult<r53d::Nameserver> {
    r53d::Nameserver::builder()
        .name(&ns.name)
        .set_glue_ips(non_empty(ns.glue_ips.iter().cloned().collect()))
        .build()
        .map_err(build_error)
}

#[async_trait]
impl DomainsApi for SdkDomains {
    async fn get_domain_detail(&self, domain_name: &str) -> ApiResult<DomainDetail> {
        let output = self
            .client
            .get_domain_detail()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;

        Ok(DomainDetail {
            domain_name: domain_name.to_string(),
            nameservers: output
                .nameservers()
                .iter()
                .map(|ns| Nameserver {
                    name: ns.name().to_string(),
                    glue_ips: ns.glue_ips().iter().cloned().collect(),
                })
                .collect(),
            auto_renew: output.auto_renew(),
            admin_contact: output.admin_contact().map(from_sdk_contact),
            registrant_contact: output.registrant_contact().map(from_sdk_contact),
            tech_contact: output.tech_contact().map(from_sdk_contact),
            admin_privacy: output.admin_privacy(),
            registrant_privacy: output.registrant_privacy(),
            tech_privacy: output.tech_privacy(),
            registrar_name: output.registrar_name().map(str::to_string),
            whois_server: output.who_is_server().map(str::to_string),
            registrar_url: output.registrar_url().map(str::to_string),
            abuse_contact_email: output.abuse_contact_email().map(str::to_string),
            abuse_contact_phone: output.abuse_contact_phone().map(str::to_string),
            creation_date: to_chrono(output.creation_date()),
            updated_date: to_chrono(output.updated_date()),
            expiration_date: to_chrono(output.expiration_date()),
            reseller: output.reseller().map(str::to_string),
            status_list: output.status_list().to_vec(),
        })
    }

    async fn update_domain_contact(
        &self,
        domain_name: &str,
        admin: Option<&ContactDetail>,
        registrant: Option<&ContactDetail>,
        tech: Option<&ContactDetail>,
    ) -> ApiResult<Option<String>> {
        let output = self
            .client
            .update_domain_contact()
            .domain_name(domain_name)
            .set_admin_contact(admin.map(to_sdk_contact).transpose()?)
            .set_registrant_contact(registrant.map(to_sdk_contact).transpose()?)
            .set_tech_contact(tech.map(to_sdk_contact).transpose()?)
            .send()
            .await
            .map_err(api_error)?;
        Ok(output.operation_id().map(str::to_string))
    }

    async fn update_domain_contact_privacy(
        &self,
        domain_name: &str,
        admin: bool,
        registrant: bool,
        tech: bool,
    ) -> ApiResult<Option<String>> {
        let output = self
            .client
            .update_domain_contact_privacy()
            .domain_name(domain_name)
            .admin_privacy(admin)
            .registrant_privacy(registrant)
            .tech_privacy(tech)
            .send()
            .await
            .map_err(api_error)?;
        Ok(output.operation_id().map(str::to_string))
    }

    async fn enable_domain_auto_renew(&self, domain_name: &str) -> ApiResult<()> {
        self.client
            .enable_domain_auto_renew()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn disable_domain_auto_renew(&self, domain_name: &str) -> ApiResult<()> {
        self.client
            .disable_domain_auto_renew()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn update_domain_nameservers(
        &self,
        domain_name: &str,
        nameservers: &[Nameserver],
    ) -> ApiResult<Option<String>> {
        let nameservers = nameservers
            .iter()
            .map(to_sdk_nameserver)
            .collect::<ApiResult<Vec<_>>>()?;
        let output = self
            .client
            .update_domain_nameservers()
            .domain_name(domain_name)
            .set_nameservers(Some(nameservers))
            .send()
            .await
            .map_err(api_error)?;
        Ok(output.operation_id().map(str::to_string))
    }

    async fn enable_domain_transfer_lock(&self, domain_name: &str) -> ApiResult<Option<String>> {
        let output = self
            .client
            .enable_domain_transfer_lock()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(output.operation_id().map(str::to_string))
    }

    async fn disable_domain_transfer_lock(&self, domain_name: &str) -> ApiResult<Option<String>> {
        let output = self
            .client
            .disable_domain_transfer_lock()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(output.operation_id().map(str::to_string))
    }

    async fn get_operation_detail(&self, operation_id: &str) -> ApiResult<OperationDetail> {
        let output = self
            .client
            .get_operation_detail()
            .operation_id(operation_id)
            .send()
            .await
            .map_err(api_error)?;

        let status = match output.status() {
            Some(r53d::OperationStatus::Successful) => OperationStatus::Successful,
            Some(r53d::OperationStatus::Error) => OperationStatus::Error,
            Some(r53d::OperationStatus::Failed) => OperationStatus::Failed,
            Some(r53d::OperationStatus::Submitted) => OperationStatus::Submitted,
            _ => OperationStatus::InProgress,
        };
        Ok(OperationDetail {
            operation_id: operation_id.to_string(),
            status,
            message: output.message().map(str::to_string),
        })
    }

    async fn list_tags_for_domain(&self, domain_name: &str) -> ApiResult<BTreeMap<String, String>> {
        let output = self
            .client
            .list_tags_for_domain()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;

        Ok(output
            .tag_list()
            .iter()
            .filter_map(|tag| {
                let key = tag.key()?;
                Some((key.to_string(), tag.value().unwrap_or_default().to_string()))
            })
            .collect())
    }

    async fn update_tags_for_domain(
        &self,
        domain_name: &str,
        tags: &BTreeMap<String, String>,
    ) -> ApiResult<()> {
        let tags = tags
            .iter()
            .map(|(k, v)| r53d::Tag::builder().key(k).value(v).build())
            .collect();
        self.client
            .update_tags_for_domain()
            .domain_name(domain_name)
            .set_tags_to_update(Some(tags))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn delete_tags_for_domain(&self, domain_name: &str, keys: &[String]) -> ApiResult<()> {
        self.client
            .delete_tags_for_domain()
            .domain_name(domain_name)
            .set_tags_to_delete(Some(keys.to_vec()))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn delete_domain(&self, domain_name: &str) -> ApiResult<Option<String>> {
        let output = self
            .client
            .delete_domain()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(output.operation_id().map(str::to_string))
    }
}
