//! Application handle (§5, §9 "global mutable state").
//!
//! Grounded on `original_source/src/htsql/application.py`'s `Application`
//! (a connection URI, an addon list, a cached catalog) and
//! `original_source/src/htsql/context.py`'s `ThreadContext` (a thread-local
//! stack of active applications, pushed on `__enter__` and popped on
//! `__exit__`). Rust has no implicit `with` block, so the push/pop pair is
//! exposed as an explicit RAII guard instead of relying on callers to match
//! calls by hand.
//!
//! [`App::connect`] is also where the two catalog-construction paths this
//! crate carries meet: [`crate::catalog::introspect::introspect_builder`]
//! builds the catalog from the same pooled connection
//! [`crate::execute::ConnectionPool`] uses for query execution, so only one
//! pool is ever opened per application.

use std::cell::RefCell;

use crate::catalog::introspect::{self, ConnectionUri, Engine};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::execute::{ConnectionPool, Product};
use crate::plan::Plan;
use crate::serializer::{mssql::Mssql, mysql::Mysql, oracle::Oracle, postgres::Postgres, sqlite::Sqlite, SqlDialect};

/// An application: a frozen catalog, its configuration, and the pooled
/// connection queries run against (§5 "one per mounted database").
pub struct App {
    catalog: Catalog,
    config: Config,
    pool: ConnectionPool,
    engine: Engine,
}

impl App {
    /// Connects to `uri`, introspects its catalog, applies any
    /// `tweak.override` addon found in `config`, and freezes the result.
    ///
    /// Mirrors `Application.__init__`: parse the connection URI, load
    /// addons, build (and in the original, cache) the catalog.
    pub async fn connect(uri: &str, config: Config) -> Result<App> {
        let parsed = ConnectionUri::parse(uri)?;
        let password = config.htsql().and_then(|h| h.password.as_deref());
        let pool = ConnectionPool::connect(&parsed.to_sqlx_url(password)).await?;

        let mut builder = introspect::introspect_builder(pool.inner(), parsed.engine).await?;
        if let Some(tweak) = config.tweak_override() {
            tweak.apply(&mut builder);
        }
        let catalog = builder.freeze();

        Ok(App { catalog, config, pool, engine: parsed.engine })
    }

    /// Builds an application around an already-introspected catalog and an
    /// already-open pool — the path integration tests use, where the
    /// catalog has been hand-built or seeded separately from the pool that
    /// serves queries.
    pub fn new(catalog: Catalog, config: Config, pool: ConnectionPool, engine: Engine) -> App {
        App { catalog, config, pool, engine }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    fn dialect(&self) -> &'static dyn SqlDialect {
        match self.engine {
            Engine::Sqlite => &Sqlite,
            Engine::Pgsql => &Postgres,
            Engine::Mysql => &Mysql,
            Engine::Mssql => &Mssql,
            Engine::Oracle => &Oracle,
        }
    }

    /// The top-level `compile(source, env?)` entry point (§6): parse, bind
    /// against this application's catalog, encode, rewrite, lower to a
    /// term, assemble and reduce a frame, then render it in this
    /// application's dialect.
    pub fn compile(&self, source: &str) -> Result<Plan> {
        let syntax = crate::syntax::parse(source)?;
        let binding = crate::binder::bind_query(&self.catalog, &syntax)?;
        let (space, fields) = crate::encoder::encode_segment(&self.catalog, &binding)?;
        let header: Vec<String> = fields.iter().map(|(name, _)| name.clone()).collect();
        let space = crate::rewrite::rewrite_space(space);
        let term = crate::compile::compile_segment(space, fields);
        let frame = crate::assemble::assemble(&self.catalog, term, None, true);
        let frame = crate::reduce::reduce_frame(frame);
        let (sql, output_columns) = crate::serializer::render_segment(&self.catalog, &frame, self.dialect())?;
        Ok(Plan::new(sql, output_columns, header))
    }

    /// Compiles and runs `source` against this application's pool (§4.9).
    pub async fn execute(&self, source: &str) -> Result<Product> {
        let plan = self.compile(source)?;
        if !self.engine.is_executable() {
            return Err(Error::engine(format!(
                "{:?} is not wired for execution in this build",
                self.engine
            )));
        }
        plan.execute(&self.pool, self.dialect()).await
    }
}

thread_local! {
    static ACTIVE_APP: RefCell<Vec<*const App>> = const { RefCell::new(Vec::new()) };
}

/// A guard returned by [`push_active`]; popping the thread-local active-app
/// stack on drop, mirroring `ThreadContext.__exit__`'s `pop()`.
pub struct ActiveAppGuard {
    _private: (),
}

impl Drop for ActiveAppGuard {
    fn drop(&mut self) {
        ACTIVE_APP.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Pushes `app` onto this thread's active-application stack for the
/// lifetime of the returned guard, mirroring `context.py`'s
/// `ThreadContext.switch` / `Application.__enter__`. Recipes, binders, and
/// addons that need "the currently running application" (§9) read it back
/// through [`with_active`] rather than threading an `&App` through every
/// call.
///
/// # Safety
/// The returned guard must not outlive `app`; callers hold `app` on the
/// stack for at least as long as the guard lives, the same discipline
/// `with` enforces in the original.
pub fn push_active(app: &App) -> ActiveAppGuard {
    ACTIVE_APP.with(|stack| {
        stack.borrow_mut().push(app as *const App);
    });
    ActiveAppGuard { _private: () }
}

/// Runs `f` with a reference to the innermost active application, or
/// returns a permission error if none is active — the `context.app`
/// property's `assert self.active_app is not None`.
pub fn with_active<R>(f: impl FnOnce(&App) -> R) -> Result<R> {
    ACTIVE_APP.with(|stack| {
        let top = stack.borrow().last().copied();
        match top {
            // SAFETY: `push_active`'s contract keeps every stacked pointer
            // valid for the lifetime of its guard, and the guard pops it
            // before `app` can be dropped.
            Some(ptr) => Ok(f(unsafe { &*ptr })),
            None => Err(Error::permission("no application is active on this thread")),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::domain::Domain;
    use crate::execute::ConnectionPool;

    async fn sample_app() -> App {
        let mut b = CatalogBuilder::new();
        let sch = b.add_schema("main", 0);
        let school = b.add_table(sch, "school");
        let id = b.add_column(school, "id", Domain::Integer, false, false);
        b.add_column(school, "code", Domain::Text, false, false);
        b.add_unique_key(school, vec![id], true, false);
        let catalog = b.freeze();
        let pool = ConnectionPool::connect("sqlite::memory:").await.unwrap();
        App::new(catalog, Config::default(), pool, Engine::Sqlite)
    }

    #[tokio::test]
    async fn compile_renders_a_simple_table_query() {
        let app = sample_app().await;
        let plan = app.compile("school").unwrap();
        assert!(plan.sql.to_lowercase().contains("select"));
        assert!(plan.sql.to_lowercase().contains("school"));
    }

    #[tokio::test]
    async fn no_application_is_active_before_push() {
        let result = with_active(|_| ());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn push_active_makes_the_app_visible_until_the_guard_drops() {
        let app = sample_app().await;
        {
            let _guard = push_active(&app);
            assert!(with_active(|a| a.engine() == Engine::Sqlite).unwrap());
        }
        assert!(with_active(|_| ()).is_err());
    }
}
