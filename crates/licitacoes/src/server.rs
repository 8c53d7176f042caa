//! MCP (Model Context Protocol) server implementation.
//!
//! Exposes the procurement queries over MCP so AI assistants can search,
//! analyze and browse the loaded record set via stdio transport.
//!
//! # Architecture
//!
//! The MCP server is a presentation layer. It wraps the same core library
//! that the CLI commands use, and each `#[tool]` method delegates to
//! `licitacoes_core` rather than implementing business logic directly.
//! Validation failures (missing terms, unknown sort mode) map to
//! `invalid_params`; everything else to `internal_error`.

use std::sync::Arc;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use licitacoes_core::{Dataset, FilterCriteria, NarrativeGenerator, SortMode, TableQuery};
use licitacoes_core::{browse, query};

/// Rows returned by `browse_licitacoes` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: usize = 100;

/// Parameters for the `get_info` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct GetInfoParams {
    /// Output format: "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "text".to_string()
}

/// Parameters for the `search_licitacoes` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Issuing body term, matched against the body and its managing unit.
    pub orgao: String,
    /// Procurement object term.
    pub objeto: String,
}

/// Parameters for the `analyze_licitacoes` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AnalyzeParams {
    /// Issuing body term. At least one of `orgao` and `objeto` is required.
    #[serde(default)]
    pub orgao: String,
    /// Procurement object term.
    #[serde(default)]
    pub objeto: String,
}

/// Parameters for the `browse_licitacoes` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct BrowseParams {
    /// Issuing body term; empty for all.
    #[serde(default)]
    pub orgao: String,
    /// Procurement object term; empty for all.
    #[serde(default)]
    pub objeto: String,
    /// Free-text search over body, object, status and municipality.
    #[serde(default)]
    pub search: String,
    /// Exact municipality label; empty for all.
    #[serde(default)]
    pub municipio: String,
    /// Row ordering: status, value-desc, value-asc or municipality.
    pub sort: Option<String>,
    /// Maximum rows to return (default 100).
    pub limit: Option<usize>,
}

/// MCP server over one loaded dataset.
#[derive(Clone)]
pub struct LicitacoesServer {
    dataset: Dataset,
    generator: Option<Arc<dyn NarrativeGenerator>>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

fn serialization_error(e: serde_json::Error) -> McpError {
    McpError::internal_error(format!("serialization error: {e}"), None)
}

#[tool_router]
impl LicitacoesServer {
    /// Create a server over `dataset`. Without a generator, analyses carry
    /// an "unavailable" narrative indicator.
    pub fn new(dataset: Dataset, generator: Option<Arc<dyn NarrativeGenerator>>) -> Self {
        Self {
            dataset,
            generator,
            tool_router: Self::tool_router(),
        }
    }

    /// Get project and dataset information.
    #[tool(description = "Get project name, version, and the loaded dataset")]
    #[tracing::instrument(skip(self), fields(otel.kind = "server"))]
    fn get_info(
        &self,
        Parameters(params): Parameters<GetInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "get_info", format = %params.format, "executing MCP tool");

        let text = if params.format == "json" {
            let info = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "description": env!("CARGO_PKG_DESCRIPTION"),
                "dataSource": self.dataset.source_name(),
                "records": self.dataset.len(),
                "narrative": self.generator.is_some(),
            });
            serde_json::to_string_pretty(&info).map_err(serialization_error)?
        } else {
            format!(
                "{} v{}\n{}\nDataset: {} ({} records)",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_DESCRIPTION"),
                self.dataset.source_name(),
                self.dataset.len(),
            )
        };

        tracing::info!(tool = "get_info", "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Strict search: both terms required, all matching records returned.
    #[tool(
        description = "Search procurement records (licitações) by issuing body (orgao) and object (objeto). Both terms are required; matching ignores case and accents. Returns every matching record."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn search_licitacoes(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "search_licitacoes", orgao = %params.orgao, objeto = %params.objeto, "executing MCP tool");

        let criteria = FilterCriteria::new(params.orgao, params.objeto);
        let result = query::search(&self.dataset, &criteria)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let json = serde_json::to_string_pretty(&result).map_err(serialization_error)?;

        tracing::info!(
            tool = "search_licitacoes",
            total_results = result.total_results,
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// KPIs plus a narrative report for the matching records.
    #[tool(
        description = "Analyze procurement records matching orgao and/or objeto: sample size, approval count and rate, total value, top 3 municipalities by approvals, a narrative BI report, and the first 5 records."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    async fn analyze_licitacoes(
        &self,
        Parameters(params): Parameters<AnalyzeParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "analyze_licitacoes", orgao = %params.orgao, objeto = %params.objeto, "executing MCP tool");

        let criteria = FilterCriteria::new(params.orgao, params.objeto);
        let analysis = query::analyze(&self.dataset, &criteria, self.generator.as_deref())
            .await
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let json = serde_json::to_string_pretty(&analysis).map_err(serialization_error)?;

        tracing::info!(
            tool = "analyze_licitacoes",
            sample_size = analysis.metrics.sample_size,
            narrative = analysis.narrative.is_report(),
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Record table with search, municipality filter, sorting and chart counts.
    #[tool(
        description = "Browse procurement records as a table: optional orgao/objeto filter, free-text search, exact municipality filter, sort (status, value-desc, value-asc, municipality), plus status and per-municipality approval counts."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    fn browse_licitacoes(
        &self,
        Parameters(params): Parameters<BrowseParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "browse_licitacoes", sort = ?params.sort, "executing MCP tool");

        let sort = match params.sort.as_deref() {
            Some(name) => name
                .parse::<SortMode>()
                .map_err(|e| McpError::invalid_params(e.to_string(), None))?,
            None => SortMode::default(),
        };
        let table = TableQuery {
            search: params.search,
            municipality: params.municipio,
            sort,
        };
        let criteria = FilterCriteria::new(params.orgao, params.objeto);

        let mut view = browse::view(&self.dataset, &criteria, &table);
        let total_rows = view.rows.len();
        view.rows.truncate(params.limit.unwrap_or(DEFAULT_BROWSE_LIMIT));

        let mut json = serde_json::to_value(&view).map_err(serialization_error)?;
        json["totalRows"] = serde_json::Value::from(total_rows);
        let text = serde_json::to_string_pretty(&json).map_err(serialization_error)?;

        tracing::info!(
            tool = "browse_licitacoes",
            total_rows,
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for LicitacoesServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(format!(
                "{} MCP server. Query Brazilian public procurement records (licitações) from {}: \
                 search_licitacoes for matching records, analyze_licitacoes for KPIs and a \
                 narrative report, browse_licitacoes for the sortable record table.",
                env!("CARGO_PKG_NAME"),
                self.dataset.source_name(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use licitacoes_core::payload::Payload;
    use licitacoes_core::{FieldMapping, NarrativeResult};
    use rmcp::model::RawContent;

    const ROWS: &str = r#"[
        {"Nome Órgão": "EXERCITO", "Objeto": "ESCRITORIO", "Situação Licitação": "HOMOLOGADO",
         "Valor Licitação": "1500,50", "Município": "Recife"},
        {"Nome Órgão": "EXERCITO BRASILEIRO", "Objeto": "ESCRITORIO MATERIAL",
         "Situação Licitação": "CANCELADO", "Valor Licitação": "abc", "Município": "Recife"},
        {"Nome Órgão": "MARINHA", "Objeto": "COMBUSTIVEL", "Situação Licitação": "CONTRATADO",
         "Valor Licitação": "99,90", "Município": "Natal"}
    ]"#;

    struct Canned;

    #[async_trait]
    impl NarrativeGenerator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _payload: &Payload<'_>) -> NarrativeResult<String> {
            Ok(r#"{"executive_summary": "s", "performance_analysis": "p",
                   "geographic_focus": "g", "recommended_actions": ["a", "b", "c"]}"#
                .to_string())
        }
    }

    fn server() -> LicitacoesServer {
        let dataset = Dataset::from_json_str(ROWS, &FieldMapping::default()).unwrap();
        LicitacoesServer::new(dataset, None)
    }

    /// Extract text from the first content item in a `CallToolResult`.
    fn extract_text(result: &CallToolResult) -> Option<&str> {
        result.content.first().and_then(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
    }

    fn extract_json(result: &CallToolResult) -> serde_json::Value {
        let text = extract_text(result).expect("should have text content");
        serde_json::from_str(text).expect("valid JSON")
    }

    #[test]
    fn server_info_has_correct_name() {
        let info = ServerHandler::get_info(&server());
        assert_eq!(info.server_info.name, env!("CARGO_PKG_NAME"));
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.expect("server should have instructions");
        assert!(instructions.contains("search_licitacoes"));
    }

    #[test]
    fn get_info_tool_reports_dataset() {
        let result = server()
            .get_info(Parameters(GetInfoParams {
                format: "json".to_string(),
            }))
            .expect("get_info should succeed");
        let json = extract_json(&result);
        assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(json["records"], 3);
        assert_eq!(json["narrative"], false);

        let result = server()
            .get_info(Parameters(GetInfoParams {
                format: "text".to_string(),
            }))
            .unwrap();
        assert!(extract_text(&result).unwrap().contains("3 records"));
    }

    #[test]
    fn search_tool_returns_matches() {
        let result = server()
            .search_licitacoes(Parameters(SearchParams {
                orgao: "Exército".to_string(),
                objeto: "escritorio".to_string(),
            }))
            .expect("search should succeed");
        assert!(!result.is_error.unwrap_or(false));
        let json = extract_json(&result);
        assert_eq!(json["status"], "success");
        assert_eq!(json["totalResults"], 2);
    }

    #[test]
    fn search_tool_rejects_missing_term() {
        let err = server()
            .search_licitacoes(Parameters(SearchParams {
                orgao: "exercito".to_string(),
                objeto: String::new(),
            }))
            .unwrap_err();
        assert!(err.message.contains("missing search terms"));
    }

    #[tokio::test]
    async fn analyze_tool_without_generator_reports_unavailable() {
        let result = server()
            .analyze_licitacoes(Parameters(AnalyzeParams {
                orgao: "exercito".to_string(),
                objeto: "escritorio".to_string(),
            }))
            .await
            .expect("analyze should succeed");
        let json = extract_json(&result);
        assert_eq!(json["metrics"]["sampleSize"], 2);
        assert_eq!(json["metrics"]["approvedCount"], 1);
        assert_eq!(json["metrics"]["approvalRatePercent"], "50.00%");
        assert_eq!(json["metrics"]["totalValue"], 1500.5);
        assert_eq!(json["metrics"]["topLocations"][0]["location"], "Recife");
        assert!(
            json["narrative"]["error"]
                .as_str()
                .unwrap()
                .contains("unavailable")
        );
    }

    #[tokio::test]
    async fn analyze_tool_includes_generated_report() {
        let dataset = Dataset::from_json_str(ROWS, &FieldMapping::default()).unwrap();
        let server = LicitacoesServer::new(dataset, Some(Arc::new(Canned)));
        let result = server
            .analyze_licitacoes(Parameters(AnalyzeParams {
                orgao: String::new(),
                objeto: "combustivel".to_string(),
            }))
            .await
            .unwrap();
        let json = extract_json(&result);
        assert_eq!(json["narrative"]["recommended_actions"][2], "c");
        assert_eq!(json["sample"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn analyze_tool_rejects_blank_terms() {
        let err = server()
            .analyze_licitacoes(Parameters(AnalyzeParams {
                orgao: " ".to_string(),
                objeto: String::new(),
            }))
            .await
            .unwrap_err();
        assert!(err.message.contains("missing search terms"));
    }

    #[test]
    fn browse_tool_sorts_and_limits() {
        let result = server()
            .browse_licitacoes(Parameters(BrowseParams {
                orgao: String::new(),
                objeto: String::new(),
                search: String::new(),
                municipio: String::new(),
                sort: Some("valor-desc".to_string()),
                limit: Some(2),
            }))
            .expect("browse should succeed");
        let json = extract_json(&result);
        assert_eq!(json["totalRows"], 3);
        assert_eq!(json["rows"].as_array().unwrap().len(), 2);
        assert_eq!(json["rows"][0]["Nome Órgão"], "EXERCITO");
        assert_eq!(json["municipalities"][0], "Natal");
        assert_eq!(json["statusBreakdown"]["approved"], 2);
    }

    #[test]
    fn browse_tool_rejects_unknown_sort() {
        let err = server()
            .browse_licitacoes(Parameters(BrowseParams {
                orgao: String::new(),
                objeto: String::new(),
                search: String::new(),
                municipio: String::new(),
                sort: Some("random".to_string()),
                limit: None,
            }))
            .unwrap_err();
        assert!(err.message.contains("unknown sort mode"));
    }
}
