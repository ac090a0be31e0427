use super::Result;
use crate::bench::QCompanies;
use crate::config::QueryConfig;
use crate::dml::SqlMergeClause;
use crate::expr::Expression;
use crate::query::SqlQuery;
use crate::serializer::SqlBindings;
use crate::templates::Dialect;
use tracing::debug;

/// What the render command prints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderTarget {
    /// The companies lookup by id
    #[default]
    Select,
    /// Row count of the lookup
    Count,
    /// Merge of one company
    Merge,
}

/// Options of the render command
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Target dialect
    pub dialect: Dialect,
    /// Render every clause on one line
    pub single_line: bool,
    /// Inline constants
    pub literals: bool,
    /// Statement to render
    pub target: RenderTarget,
}

/// Build the statement described by `options`
pub fn render(options: &RenderOptions) -> Result<SqlBindings> {
    let configuration = QueryConfig {
        dialect: options.dialect,
        use_literals: options.literals,
        single_line: options.single_line,
        ..QueryConfig::default()
    }
    .configuration();
    let companies = QCompanies::fixture();
    debug!("Rendering {:?} for {}", options.target, options.dialect);

    let bindings = match options.target {
        RenderTarget::Select => SqlQuery::new(&configuration)
            .from(&companies)
            .where_(companies.id.eq(1))
            .to_sql(&companies.name)?,
        RenderTarget::Count => SqlQuery::new(&configuration)
            .from(&companies)
            .where_(companies.id.eq(1))
            .count_sql()?,
        RenderTarget::Merge => SqlMergeClause::new(&configuration, &companies)
            .key(&companies.id)
            .set(&companies.id, 1)
            .set(&companies.name, "acme")
            .to_sql()?,
    };
    Ok(bindings)
}

/// Handle the render command: print the statement and its bind values
#[allow(clippy::disallowed_methods)]
pub fn handle_render(options: &RenderOptions) -> Result<()> {
    let bindings = render(options)?;
    println!("{}", bindings.sql);
    if !bindings.constants.is_empty() {
        let constants: Vec<String> = bindings.constants.iter().map(ToString::to_string).collect();
        println!("-- constants: {}", constants.join(", "));
    }
    Ok(())
}
