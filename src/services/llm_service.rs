use crate::config::LlmConfig;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

/// Turns a natural language question into a SQL statement
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(&self, prompt: &str) -> Result<String, AppError>;
}

/// LLM gateway client used as the SQL generator
pub struct LlmService {
    gateway_url: String,
    api_key: Option<String>,
    model: Option<String>,
    schema_context: Option<String>,
    database_type: String,
    http_client: HttpClient,
}

impl LlmService {
    pub fn new(config: &LlmConfig, database_type: &str) -> Result<Self, AppError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            gateway_url: config.gateway_url.trim().to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone().filter(|m| !m.is_empty()),
            schema_context: config.schema_context.clone().filter(|s| !s.trim().is_empty()),
            database_type: database_type.to_string(),
            http_client,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.gateway_url.is_empty()
    }

    /// Build the instruction prompt sent to the gateway
    fn build_prompt(&self, question: &str) -> String {
        let dialect_hints = match self.database_type.as_str() {
            "postgresql" => r#"
- Use PostgreSQL syntax and functions
- Use LIMIT syntax (or FETCH FIRST)
- For dates, use functions like NOW(), CURRENT_DATE, interval arithmetic
- Use double quotes for identifier quoting if needed: "table_name""#,
            _ => r#"
- Use MySQL syntax and functions
- Use LIMIT syntax (not TOP or FETCH FIRST)
- For dates, use functions like NOW(), CURDATE(), DATE_SUB(), etc.
- Use backticks for identifier quoting if needed: `table_name`"#,
        };

        let schema_section = match &self.schema_context {
            Some(schema) => format!("\nDatabase Schema:\n{}\n", schema.trim()),
            None => String::new(),
        };

        format!(
            r#"You are a SQL expert. Given a natural language question, generate a single valid {database_type} query.
{schema_section}
Question: {question}

Instructions:
1. Return ONLY the SQL query, no explanations or markdown formatting
2. If the question asks about "数量" (count) or "多少" (how many), use COUNT(*)
3. If the question asks about specific columns, select only those columns
{dialect_hints}

SQL Query:"#,
            database_type = self.database_type,
            schema_section = schema_section,
            question = question,
            dialect_hints = dialect_hints
        )
    }

    /// Call the LLM gateway and return the raw response body
    async fn call_llm_api(&self, prompt: &str) -> Result<Value, AppError> {
        let mut body = json!({
            "prompt": prompt,
            "max_tokens": 500,
            "temperature": 0.1,
        });
        if let Some(model) = &self.model {
            body["model"] = json!(model);
        }

        let mut request = self.http_client.post(&self.gateway_url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to call LLM service: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "LLM service returned error {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse LLM response: {}", e)))
    }

    /// Pull the SQL text out of the gateway response
    ///
    /// Accepts plain gateway shapes (`text`, `content`, `response`, `sql`) and
    /// OpenAI-style `choices`.
    fn extract_sql(response: &Value) -> Option<&str> {
        ["text", "content", "response", "sql"]
            .iter()
            .find_map(|field| response[*field].as_str())
            .or_else(|| response["choices"][0]["message"]["content"].as_str())
            .or_else(|| response["choices"][0]["text"].as_str())
    }

    /// Remove markdown code fences around a statement
    fn clean_sql(sql: &str) -> String {
        sql.trim()
            .trim_start_matches("```sql")
            .trim_start_matches("```SQL")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    }
}

#[async_trait]
impl SqlGenerator for LlmService {
    async fn generate_sql(&self, prompt: &str) -> Result<String, AppError> {
        if !self.is_configured() {
            return Err(AppError::Generation("LLM gateway not configured".to_string()));
        }

        let response = self.call_llm_api(&self.build_prompt(prompt)).await?;

        let sql = Self::extract_sql(&response)
            .map(Self::clean_sql)
            .ok_or_else(|| AppError::Generation("LLM response does not contain SQL query".to_string()))?;

        if sql.is_empty() {
            return Err(AppError::Generation("LLM returned an empty SQL statement".to_string()));
        }

        tracing::info!("Generated SQL: {}", sql);
        Ok(sql)
    }
}
