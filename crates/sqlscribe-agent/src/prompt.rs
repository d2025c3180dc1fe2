//! System prompt for the SQL agent

use crate::toolkit::{DESCRIBE_TABLE, LIST_TABLES, RUN_SQL_QUERY};

/// Build the system prompt. The schema DDL is included when it was available at startup.
pub fn build_system_prompt(schema_name: &str, schema_ddl: Option<&str>, max_rows: usize) -> String {
    let mut prompt = format!(
        "You are a SQL assistant for a PostgreSQL database. Answer questions about the data \
         in the `{schema_name}` schema by querying it.\n\
         \n\
         Tools:\n\
         - `{LIST_TABLES}` lists the tables.\n\
         - `{DESCRIBE_TABLE}` shows the columns of one table.\n\
         - `{RUN_SQL_QUERY}` runs one read-only SQL statement and returns at most {max_rows} rows.\n\
         \n\
         Rules:\n\
         - Only read data. Never attempt INSERT, UPDATE, DELETE or DDL; the session rejects writes.\n\
         - Qualify tables with the schema name and quote identifiers that need it.\n\
         - If a query fails, read the error, fix the SQL and try again.\n\
         - When the answer is the result set of a query, reply with exactly the JSON object \
         `{RUN_SQL_QUERY}` returned and nothing else.\n\
         - Otherwise reply in short plain text.\n"
    );

    match schema_ddl {
        Some(ddl) => {
            prompt.push_str("\nDatabase schema:\n");
            prompt.push_str(ddl);
            prompt.push('\n');
        }
        None => prompt.push_str(&format!(
            "\nThe schema could not be loaded in advance; use `{LIST_TABLES}` and \
             `{DESCRIBE_TABLE}` to discover it.\n"
        )),
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_schema_ddl() {
        let ddl = "CREATE TABLE public.\"employees\" (\n    \"id\" INTEGER NOT NULL\n);";
        let prompt = build_system_prompt("public", Some(ddl), 200);
        assert!(prompt.contains("`public` schema"));
        assert!(prompt.contains("at most 200 rows"));
        assert!(prompt.ends_with(&format!("Database schema:\n{ddl}\n")));
    }

    #[test]
    fn test_prompt_without_schema_points_at_discovery_tools() {
        let prompt = build_system_prompt("sales", None, 50);
        assert!(prompt.contains("could not be loaded in advance"));
        assert!(!prompt.contains("Database schema:"));
    }
}
