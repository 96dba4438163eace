//! Deployment endpoint derivation and metadata assembly.

use serde_json::{json, Value};

use crate::adapter::{AdapterDescriptor, AdapterType};
use crate::config::FlowBridgeConfig;
use crate::models::IntegrationFlow;

/// Reduce a flow name to a URL/path-safe slug: lowercase alphanumerics with
/// single dashes, no leading or trailing dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut previous_dash = true; // suppress a leading dash
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Compute the deployment endpoint for a flow.
///
/// An explicitly configured endpoint is normalized to start with `/`, and
/// prefixed with `/soap` for SOAP inbound adapters when not already
/// present. Otherwise the path derives from the slugified flow name,
/// branching by the inbound adapter's protocol family.
pub fn generate_endpoint(
    flow: &IntegrationFlow,
    inbound: &AdapterDescriptor,
    config: &FlowBridgeConfig,
) -> String {
    if let Some(configured) = &flow.configured_endpoint {
        let mut endpoint = if configured.starts_with('/') {
            configured.clone()
        } else {
            format!("/{configured}")
        };
        let soap_prefixed = endpoint == "/soap" || endpoint.starts_with("/soap/");
        if inbound.adapter_type == AdapterType::Soap && !soap_prefixed {
            endpoint = format!("/soap{endpoint}");
        }
        return endpoint;
    }

    let slug = slugify(&flow.name);
    if inbound.adapter_type.is_http_family() {
        format!("/api/integration/{slug}")
    } else if inbound.adapter_type == AdapterType::Soap {
        format!("/soap/{slug}")
    } else if inbound.adapter_type.is_file_based() {
        format!("{}/{slug}", config.flows_directory.trim_end_matches('/'))
    } else {
        format!("/integration/{slug}")
    }
}

/// Assemble deployment metadata.
///
/// Always includes flow name/id, adapter type/mode and the endpoint;
/// adapter-type-specific extras are merged in (WSDL URL for SOAP, API-docs
/// URL for HTTP/REST, polling flags for file-based adapters).
pub fn build_metadata(
    flow: &IntegrationFlow,
    inbound: &AdapterDescriptor,
    endpoint: &str,
    config: &FlowBridgeConfig,
) -> Value {
    let mut metadata = json!({
        "flow_name": flow.name,
        "flow_id": flow.id.to_string(),
        "adapter_type": inbound.adapter_type.label(),
        "adapter_mode": inbound.mode.label(),
        "endpoint": endpoint,
    });

    let extras = match inbound.adapter_type {
        AdapterType::Soap => json!({ "wsdl_url": format!("{endpoint}?wsdl") }),
        AdapterType::Http | AdapterType::Rest => json!({
            "api_docs_url": format!("{}{endpoint}", config.api_docs_base_url),
        }),
        t if t.is_file_based() => json!({
            "polling": true,
            "watch_path": endpoint,
        }),
        _ => json!({}),
    };

    if let (Some(base), Some(extra)) = (metadata.as_object_mut(), extras.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterMode;

    fn inbound(adapter_type: AdapterType) -> AdapterDescriptor {
        AdapterDescriptor::new("in-1", "inbound", adapter_type, AdapterMode::Inbound)
    }

    fn config() -> FlowBridgeConfig {
        FlowBridgeConfig::default()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Order Sync Flow"), "order-sync-flow");
        assert_eq!(slugify("  CRM -> ERP!  "), "crm-erp");
        assert_eq!(slugify("already-slugged"), "already-slugged");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn test_derived_endpoints_by_protocol_family() {
        let flow = IntegrationFlow::new("Order Sync");

        assert_eq!(
            generate_endpoint(&flow, &inbound(AdapterType::Rest), &config()),
            "/api/integration/order-sync"
        );
        assert_eq!(
            generate_endpoint(&flow, &inbound(AdapterType::Soap), &config()),
            "/soap/order-sync"
        );
        assert_eq!(
            generate_endpoint(&flow, &inbound(AdapterType::Sftp), &config()),
            "/var/flowbridge/flows/order-sync"
        );
        assert_eq!(
            generate_endpoint(&flow, &inbound(AdapterType::Kafka), &config()),
            "/integration/order-sync"
        );
    }

    #[test]
    fn test_explicit_endpoint_normalization() {
        let flow = IntegrationFlow::new("x").with_configured_endpoint("custom/path");
        assert_eq!(
            generate_endpoint(&flow, &inbound(AdapterType::Rest), &config()),
            "/custom/path"
        );

        // SOAP prefix added when absent, kept when present
        assert_eq!(
            generate_endpoint(&flow, &inbound(AdapterType::Soap), &config()),
            "/soap/custom/path"
        );
        let presoaped = IntegrationFlow::new("x").with_configured_endpoint("/soap/custom");
        assert_eq!(
            generate_endpoint(&presoaped, &inbound(AdapterType::Soap), &config()),
            "/soap/custom"
        );

        // A path that merely begins with the letters "soap" is not
        // considered prefixed
        let soapbox = IntegrationFlow::new("x").with_configured_endpoint("/soapbox");
        assert_eq!(
            generate_endpoint(&soapbox, &inbound(AdapterType::Soap), &config()),
            "/soap/soapbox"
        );
    }

    #[test]
    fn test_metadata_extras() {
        let flow = IntegrationFlow::new("Order Sync");

        let soap = build_metadata(&flow, &inbound(AdapterType::Soap), "/soap/order-sync", &config());
        assert_eq!(soap["wsdl_url"], "/soap/order-sync?wsdl");
        assert_eq!(soap["flow_name"], "Order Sync");
        assert_eq!(soap["adapter_mode"], "inbound");

        let rest = build_metadata(
            &flow,
            &inbound(AdapterType::Rest),
            "/api/integration/order-sync",
            &config(),
        );
        assert_eq!(rest["api_docs_url"], "/api-docs/api/integration/order-sync");

        let file = build_metadata(&flow, &inbound(AdapterType::File), "/flows/x", &config());
        assert_eq!(file["polling"], true);
    }
}
