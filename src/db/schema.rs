//! Static schema descriptor for the health dataset.
//!
//! The descriptor is prompt context only: it is rendered into the SQL
//! generation prompt and never parsed back. It must match the live database
//! schema; drift shows up as bad generated queries, not as a crash.

use serde::Serialize;

/// Version of the bundled descriptor. Bump when the tables change.
pub const SCHEMA_VERSION: &str = "2024.1";

/// Immutable description of the permitted tables and columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDescriptor {
    /// Descriptor version.
    pub version: String,

    /// Tables in prompt order.
    pub tables: Vec<TableDescriptor>,

    /// Join paths between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl SchemaDescriptor {
    /// The `health_static` / `steps_daily` schema the executor targets.
    pub fn health() -> Self {
        let health_static = TableDescriptor::new("health_static")
            .column("Patient_Number", "BIGINT")
            .column("Blood_Pressure_Abnormality", "INTEGER")
            .column("Level_of_Hemoglobin", "FLOAT")
            .column("Genetic_Pedigree_Coefficient", "FLOAT")
            .column("Age", "INTEGER")
            .column("BMI", "FLOAT")
            .column("Sex", "INTEGER")
            .column("Pregnancy", "INTEGER")
            .column("Smoking", "INTEGER")
            .column("salt_content_in_the_diet", "FLOAT")
            .column("alcohol_consumption_per_day", "FLOAT")
            .column("Level_of_Stress", "INTEGER")
            .column("Chronic_kidney_disease", "INTEGER")
            .column("Adrenal_and_thyroid_disorders", "INTEGER")
            .primary_key(["Patient_Number"]);

        let steps_daily = TableDescriptor::new("steps_daily")
            .column("id", "BIGINT")
            .column("Patient_Number", "BIGINT")
            .column("Day_Number", "INTEGER")
            .column("Physical_activity", "INTEGER")
            .primary_key(["id"]);

        Self {
            version: SCHEMA_VERSION.to_string(),
            tables: vec![health_static, steps_daily],
            foreign_keys: vec![ForeignKey::new(
                "steps_daily",
                "Patient_Number",
                "health_static",
                "Patient_Number",
            )],
        }
    }

    /// Table names in descriptor order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    pub fn format_for_llm(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|column| format!("  {} {}", column.name, column.data_type))
                    .collect::<Vec<_>>()
                    .join(",\n");
                format!("TABLE {} (\n{}\n);\n", table.name, columns)
            })
            .collect::<Vec<_>>()
            .join("\n");

        if self.foreign_keys.is_empty() {
            return tables_text;
        }

        let fk_lines = self
            .foreign_keys
            .iter()
            .map(|fk| {
                format!(
                    "  - {}.{} -> {}.{}\n",
                    fk.from_table, fk.from_column, fk.to_table, fk.to_column
                )
            })
            .collect::<String>();

        format!("{}\nJoins:\n{}", tables_text, fk_lines)
    }
}

/// Represents one permitted table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,

    /// Columns in table order.
    pub columns: Vec<ColumnDescriptor>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl TableDescriptor {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Appends a column.
    pub fn column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(ColumnDescriptor::new(name, data_type));
        self
    }

    /// Sets the primary key columns.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// A column and its semantic type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name, exact case.
    pub name: String,

    /// Data type (e.g., "INTEGER", "FLOAT").
    pub data_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl ForeignKey {
    /// Creates a new single-column foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }
}
