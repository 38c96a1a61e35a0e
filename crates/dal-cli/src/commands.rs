//! Subcommand bodies, writing to any [`Write`] sink

use anyhow::{bail, Context};
use dal_core::diagnostics::containment_cycles;
use dal_core::{ConfigGraph, ConfigStore, ResolverConfig, Session};
use std::io::Write;
use std::sync::Arc;

/// Open `uid`, or the only session of the database when no uid is given
pub(crate) fn open_session(
    store: Arc<ConfigStore>,
    uid: Option<&String>,
    config: ResolverConfig,
) -> anyhow::Result<Session> {
    let uid = match uid {
        Some(uid) => uid.clone(),
        None => {
            let graph = store.snapshot();
            match graph.sessions().as_slice() {
                [only] => graph.uid(*only),
                [] => bail!("database has no session"),
                many => bail!("database has {} sessions, select one with --session", many.len()),
            }
        }
    };
    Session::open_with_config(store, &uid, config).with_context(|| format!("cannot open session '{uid}'"))
}

pub(crate) fn list_apps(session: &Session, enable_disabled: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let graph = session.store().snapshot();
    if enable_disabled {
        session.set_enabled(graph.disabled(session.root()?));
    }

    let apps = session.all_applications()?;
    writeln!(out, "session '{}' has {} applications", session.uid(), apps.len())?;
    for app in apps {
        let component = graph.get(app)?;
        if session.is_disabled(app)? {
            writeln!(out, "{component} <disabled>")?;
            continue;
        }
        writeln!(out, "{component}")?;
        for &member in component.contains() {
            let marker = if session.is_disabled(member)? { " <disabled>" } else { "" };
            writeln!(out, "  - {}{marker}", graph.get(member)?)?;
        }
    }

    if let Some(stats) = session.stats() {
        tracing::info!(
            passes = stats.passes,
            disabled = stats.disabled,
            converged = stats.converged,
            "resolution finished"
        );
    }
    Ok(())
}

pub(crate) fn parents(session: &Session, uid: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let graph = session.store().snapshot();
    let target = graph
        .find(uid)
        .with_context(|| format!("no component '{uid}' in the database"))?;

    let paths = session.get_parents(target)?;
    if paths.is_empty() {
        writeln!(out, "{} has no parents in session '{}'", graph.get(target)?, session.uid())?;
        return Ok(());
    }
    writeln!(out, "{} is contained by:", graph.get(target)?)?;
    for path in paths {
        if path.is_empty() {
            writeln!(out, "  (top level)")?;
        } else {
            let names: Vec<String> = path.iter().map(|&id| graph.uid(id)).collect();
            writeln!(out, "  {}", names.join(" > "))?;
        }
    }
    Ok(())
}

/// Returns true when the database has no containment cycle
pub(crate) fn check(graph: &ConfigGraph, out: &mut impl Write) -> anyhow::Result<bool> {
    let cycles = containment_cycles(graph);
    writeln!(
        out,
        "{} components, {} sessions, {} containment cycles",
        graph.len(),
        graph.sessions().len(),
        cycles.len()
    )?;
    for cycle in &cycles {
        let names: Vec<String> = cycle.iter().map(|&id| graph.uid(id)).collect();
        writeln!(out, "cycle: {}", names.join(", "))?;
    }
    Ok(cycles.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dal_core::GraphBuilder;
    use dal_test_utils::{scenario_store, segment_chain, store_of};

    fn render(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn list_apps_marks_disabled_members() {
        let mut b = GraphBuilder::new();
        b.session("R", &["S"], &["O"], &["A"])
            .segment("S", &[], &["N", "B"], &[])
            .and_set("N", &["O", "B"])
            .or_set("O", &["A"])
            .plain("A")
            .plain("B");
        let session = open_session(store_of(b), None, ResolverConfig::default()).unwrap();

        let out = render(|w| list_apps(&session, false, w));
        assert_eq!(
            out,
            "session 'R' has 3 applications\n\
             'O@ResourceSetOR' <disabled>\n\
             'N@ResourceSetAND'\n\
             \x20 - 'O@ResourceSetOR' <disabled>\n\
             \x20 - 'B@Component'\n\
             'B@Component'\n"
        );

        let out = render(|w| list_apps(&session, true, w));
        assert!(!out.contains("<disabled>"));
    }

    #[test]
    fn session_must_be_chosen_when_ambiguous() {
        let mut b = GraphBuilder::new();
        b.session("R1", &[], &[], &[]).session("R2", &[], &[], &[]);
        let store = store_of(b);

        let err = open_session(store.clone(), None, ResolverConfig::default()).unwrap_err();
        assert!(err.to_string().contains("2 sessions"));
        let session = open_session(store, Some(&"R2".to_owned()), ResolverConfig::default()).unwrap();
        assert_eq!(session.uid(), "R2");
    }

    #[test]
    fn parents_prints_paths() {
        let session = open_session(scenario_store(), None, ResolverConfig::default()).unwrap();
        let out = render(|w| parents(&session, "A", w));
        assert_eq!(out, "'A@Component' is contained by:\n  S > N > O\n");

        let out = render(|w| parents(&session, "S", w));
        assert!(out.contains("(top level)"));
    }

    #[test]
    fn check_reports_cycles() {
        let store = store_of(segment_chain(2, true));
        let mut out = Vec::new();
        assert!(!check(&store.snapshot(), &mut out).unwrap());
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("1 containment cycles"));
        assert!(out.contains("cycle: S0, S1"));

        let mut out = Vec::new();
        assert!(check(&scenario_store().snapshot(), &mut out).unwrap());
    }
}
