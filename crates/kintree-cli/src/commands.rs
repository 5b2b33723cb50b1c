//! CLI command implementations.

use crate::config::Config;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kintree_core::{
    sample_snapshot, Association, Family, Gender, Member, RelationshipEdge, RelationshipKind,
    Snapshot, SnapshotSource,
};
use kintree_graph::{FamilyGraph, FamilyScope, GraphBuilder, SearchIndex, SnapshotStore, TreeRole};
use kintree_server::{ServerConfig, TreeServer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Where commands read records from.
pub struct Context {
    root: PathBuf,
    config: Config,
    snapshot_file: Option<PathBuf>,
}

impl Context {
    pub fn new(root: PathBuf, snapshot_file: Option<PathBuf>) -> Result<Self> {
        let config = Config::load(&root)?;
        Ok(Self {
            root,
            config,
            snapshot_file,
        })
    }

    fn store_path(&self) -> PathBuf {
        self.config.store_path(&self.root)
    }

    fn open_store(&self) -> Result<SnapshotStore> {
        let path = self.store_path();
        debug!("Opening store at {}", path.display());
        Ok(SnapshotStore::open(path)?)
    }

    /// Opens the store for an edit. Snapshot files are read-only inputs.
    fn edit_store(&self) -> Result<SnapshotStore> {
        if let Some(path) = &self.snapshot_file {
            return Err(format!(
                "{} is a snapshot file; edits apply to the store, run without --snapshot",
                path.display()
            )
            .into());
        }
        self.open_store()
    }

    /// Loads the records from the snapshot file if one was given,
    /// otherwise from the store.
    fn snapshot(&self) -> Result<Snapshot> {
        match &self.snapshot_file {
            Some(path) => Ok(Snapshot::load(path)?),
            None => Ok(self.open_store()?.load_snapshot()?),
        }
    }
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message);
    Ok(spinner)
}

fn label(member: &Member) -> String {
    let mut label = format!("{} {}", member.name, format!("[{}]", member.id).dimmed());
    if let Some(ref occupation) = member.occupation {
        label.push_str(&format!(" {}", occupation.dimmed()));
    }
    label
}

/// Initialize Kintree in a directory.
pub fn init(ctx: &Context) -> Result<()> {
    let workspace = Config::workspace(&ctx.root);

    if workspace.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let config_path = Config::default().save(&ctx.root)?;

    println!("{} Initialized Kintree in {}", "✓".green(), ctx.root.display());
    println!("  Config written to {}", config_path.display());
    println!(
        "  Run {} or {} to load records",
        "kintree import <file>".cyan(),
        "kintree seed".cyan()
    );

    Ok(())
}

/// Replace the stored records with a JSON snapshot.
pub fn import(ctx: &Context, file: &Path) -> Result<()> {
    let spinner = spinner("Loading records...")?;

    let snapshot = Snapshot::load(file)?;
    let store = ctx.open_store()?;
    store.save_snapshot(&snapshot)?;

    spinner.finish_and_clear();

    println!(
        "{} Imported {} families, {} members, {} relationships",
        "✓".green(),
        snapshot.families.len().to_string().cyan(),
        snapshot.members.len().to_string().cyan(),
        snapshot.relationships.len().to_string().cyan()
    );

    let mut builder = GraphBuilder::new();
    builder.add_members(snapshot.members);
    builder.add_edges(&snapshot.relationships);
    let (_, report) = builder.build_with_report();
    let skipped = report.dangling + report.self_referential + report.duplicate_members;
    if skipped > 0 {
        println!(
            "{} {} records will be skipped when building trees, run {} for details",
            "⚠".yellow(),
            skipped,
            "kintree check".cyan()
        );
    }

    Ok(())
}

/// Load the sample families into an empty store.
pub fn seed(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;

    if !store.is_empty()? {
        println!("{} Store already has records, nothing seeded", "✓".green());
        return Ok(());
    }

    let snapshot = sample_snapshot();
    store.save_snapshot(&snapshot)?;

    println!(
        "{} Seeded {} families with {} members",
        "✓".green(),
        snapshot.families.len(),
        snapshot.members.len()
    );

    Ok(())
}

/// Write the records to a JSON snapshot.
pub fn export(ctx: &Context, output: &Path) -> Result<()> {
    let snapshot = ctx.snapshot()?;
    snapshot.save(output)?;
    println!("{} Exported to {}", "✓".green(), output.display());
    Ok(())
}

/// Optional and required fields of a member record, as given on the
/// command line.
pub struct MemberFields {
    pub id: String,
    pub family: String,
    pub name: String,
    pub age: Option<u32>,
    pub occupation: Option<String>,
    pub contact: Option<String>,
    pub gender: Option<String>,
}

/// Add or update a family.
pub fn add_family(ctx: &Context, id: &str, name: &str, description: Option<String>) -> Result<()> {
    let store = ctx.edit_store()?;

    let mut family = Family::new(id, name);
    family.description = description;
    store.upsert_family(family)?;

    println!("{} Saved family {}", "✓".green(), id.cyan());
    Ok(())
}

/// Add or update a member.
pub fn add_member(ctx: &Context, fields: MemberFields) -> Result<()> {
    let gender = fields
        .gender
        .as_deref()
        .map(str::parse::<Gender>)
        .transpose()?;

    let store = ctx.edit_store()?;
    if !store.list_families()?.iter().any(|f| f.id == fields.family) {
        println!(
            "{} Family {} does not exist yet",
            "⚠".yellow(),
            fields.family.yellow()
        );
    }

    let mut member = Member::new(&fields.id, fields.family, fields.name);
    member.age = fields.age;
    member.occupation = fields.occupation;
    member.contact = fields.contact;
    member.gender = gender;
    store.upsert_member(member)?;

    println!("{} Saved member {}", "✓".green(), fields.id.cyan());
    Ok(())
}

/// Remove a member and their relationships.
pub fn remove_member(ctx: &Context, id: &str) -> Result<()> {
    let store = ctx.edit_store()?;
    let removed = store.remove_member(id)?;

    println!(
        "{} Removed member {} and {} relationships",
        "✓".green(),
        id.cyan(),
        removed
    );
    Ok(())
}

/// Record a relationship between two members.
///
/// The edge is stored as given. Unknown kinds and missing members are
/// only reported, since trees skip such edges anyway.
pub fn link(
    ctx: &Context,
    member1: &str,
    kind: &str,
    member2: &str,
    id: Option<String>,
) -> Result<()> {
    let store = ctx.edit_store()?;
    let id = id.unwrap_or_else(|| {
        format!("{}-{}-{}", member1, kind.trim().to_lowercase(), member2)
    });

    if kind.parse::<RelationshipKind>().is_err() {
        println!(
            "{} {} is not a known relationship, it will not appear in trees",
            "⚠".yellow(),
            kind.yellow()
        );
    }
    let members = store.list_members(None)?;
    for endpoint in [member1, member2] {
        if !members.iter().any(|m| m.id == endpoint) {
            println!("{} No member {} yet", "⚠".yellow(), endpoint.yellow());
        }
    }

    store.add_relationship(RelationshipEdge::new(&id, member1, member2, kind))?;

    println!("{} Saved relationship {}", "✓".green(), id.cyan());
    Ok(())
}

/// Remove a relationship.
pub fn unlink(ctx: &Context, id: &str) -> Result<()> {
    let store = ctx.edit_store()?;
    store.remove_relationship(id)?;

    println!("{} Removed relationship {}", "✓".green(), id.cyan());
    Ok(())
}

/// Print the family forest.
pub fn tree(ctx: &Context, family: Option<String>, json: bool) -> Result<()> {
    let snapshot = ctx.snapshot()?;
    let graph = FamilyGraph::build(snapshot.members, &snapshot.relationships);
    let forest = graph.forest(FamilyScope::from_option(family));

    if json {
        println!("{}", serde_json::to_string_pretty(&forest.trees())?);
        return Ok(());
    }

    if forest.is_empty() {
        println!("No members found");
        return Ok(());
    }

    for entry in forest.walk() {
        match entry.role {
            TreeRole::Root => {
                println!();
                println!("{}", label(entry.member).bold());
            }
            TreeRole::Child => {
                let indent = "    ".repeat(entry.depth.saturating_sub(1));
                println!("{}└── {}", indent, label(entry.member));
            }
            TreeRole::Spouse => {
                let indent = "    ".repeat(entry.depth);
                println!("{}  {} {}", indent, "⚭".magenta(), label(entry.member));
            }
        }
    }

    Ok(())
}

/// Show a member with their spouses and children.
pub fn family(ctx: &Context, member: &str, json: bool) -> Result<()> {
    let snapshot = ctx.snapshot()?;
    let graph = FamilyGraph::build(snapshot.members, &snapshot.relationships);
    let family = graph.nuclear_family(member);

    let Some(seed) = family.seed else {
        return Err(format!("Member not found: {}", member).into());
    };

    if json {
        let value = serde_json::json!({
            "seed": seed,
            "spouses": family.spouses,
            "children": family.children,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", label(seed).bold());

    if family.spouses.is_empty() {
        println!("  {} none", "Spouses:".dimmed());
    } else {
        println!("  {}", "Spouses:".dimmed());
        for spouse in &family.spouses {
            println!("    {}", label(spouse));
        }
    }

    if family.children.is_empty() {
        println!("  {} none", "Children:".dimmed());
    } else {
        println!("  {}", "Children:".dimmed());
        for child in &family.children {
            println!("    {}", label(child));
        }
    }

    Ok(())
}

/// Search members and families.
pub fn search(ctx: &Context, query: &str, limit: Option<usize>) -> Result<()> {
    let snapshot = ctx.snapshot()?;
    let index = SearchIndex::new(&snapshot.members, &snapshot.families);
    let result = index.search_limited(query, Some(limit.unwrap_or(ctx.config.search_limit)));

    if result.is_empty() {
        println!("No matches found for \"{}\"", query);
        return Ok(());
    }

    if !result.families.is_empty() {
        println!("Found {} families:\n", result.families.len());
        for family in &result.families {
            println!(
                "  {} {}",
                family.name.cyan(),
                format!("[{}]", family.id).dimmed()
            );
            if let Some(ref description) = family.description {
                println!("    {}", description.dimmed());
            }
        }
        println!();
    }

    if !result.members.is_empty() {
        println!("Found {} members:\n", result.members.len());
        for member in &result.members {
            let family = snapshot
                .family(&member.family_id)
                .map(|f| f.name.as_str())
                .unwrap_or(member.family_id.as_str());
            println!("  {} {}", label(member), family.yellow());
        }
    }

    Ok(())
}

/// List the raw relationships of a member.
pub fn relations(ctx: &Context, member: &str) -> Result<()> {
    let snapshot = ctx.snapshot()?;

    let Some(subject) = snapshot.member(member) else {
        return Err(format!("Member not found: {}", member).into());
    };

    let edges = snapshot.member_relationships(member)?;
    if edges.is_empty() {
        println!("{} has no relationships", subject.name);
        return Ok(());
    }

    println!("{}\n", label(subject).bold());

    let name = |id: &str| {
        snapshot
            .member(id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("{} (missing)", id).red().to_string())
    };

    for edge in &edges {
        let association =
            RelationshipKind::resolve(&edge.relationship_type, &edge.member1_id, &edge.member2_id);
        let line = format!(
            "  {} {} {}",
            name(&edge.member1_id),
            edge.relationship_type.yellow(),
            name(&edge.member2_id)
        );
        if association == Association::Ignored {
            println!("{} {}", line, "(not used in trees)".dimmed());
        } else {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Report skipped records and lineage loops.
pub fn check(ctx: &Context) -> Result<()> {
    let snapshot = ctx.snapshot()?;

    let mut builder = GraphBuilder::new();
    builder.add_members(snapshot.members);
    builder.add_edges(&snapshot.relationships);
    let (graph, report) = builder.build_with_report();

    println!("{}", "Kintree Check".cyan().bold());
    println!();
    println!("  {} {}", "Applied edges:".dimmed(), report.applied);
    println!("  {} {}", "Duplicate edges:".dimmed(), report.duplicates);
    println!("  {} {}", "Ignored edges:".dimmed(), report.ignored);

    let warnings = [
        ("Dangling edges:", report.dangling),
        ("Self-referential edges:", report.self_referential),
        ("Duplicate member ids:", report.duplicate_members),
    ];
    for (name, count) in warnings {
        if count > 0 {
            println!("  {} {}", name.yellow(), count.to_string().yellow());
        } else {
            println!("  {} {}", name.dimmed(), count);
        }
    }

    let cycles = graph.lineage_cycles();
    println!();
    if cycles.is_empty() {
        println!("{} No lineage cycles", "✓".green());
    } else {
        println!("{} {} lineage cycles:", "⚠".yellow(), cycles.len());
        for cycle in &cycles {
            let names: Vec<_> = cycle
                .iter()
                .filter_map(|id| graph.get(id))
                .map(|node| node.member.name.as_str())
                .collect();
            println!("  {}", names.join(" → ").red());
        }
    }

    Ok(())
}

/// Show store status.
pub fn status(ctx: &Context) -> Result<()> {
    let workspace = Config::workspace(&ctx.root);
    if !workspace.exists() && ctx.snapshot_file.is_none() {
        println!("{} Kintree not initialized in this directory", "✗".red());
        println!("  Run {} to initialize", "kintree init".cyan());
        println!("  Using store at {}", ctx.store_path().display());
    }

    let snapshot = ctx.snapshot()?;
    let families = snapshot.families.len();
    let relationships = snapshot.relationships.len();
    let stats = FamilyGraph::build(snapshot.members, &snapshot.relationships).stats();

    println!("{}", "Kintree Status".cyan().bold());
    println!();
    match &ctx.snapshot_file {
        Some(path) => println!("  {} {}", "Snapshot:".dimmed(), path.display()),
        None => println!("  {} {}", "Store:".dimmed(), ctx.store_path().display()),
    }
    println!("  {} {}", "Families:".dimmed(), families);
    println!("  {} {}", "Members:".dimmed(), stats.members);
    println!("  {} {}", "Relationships:".dimmed(), relationships);
    println!("  {} {}", "Parent links:".dimmed(), stats.parent_links);
    println!("  {} {}", "Spouse links:".dimmed(), stats.spouse_links);
    println!("  {} {}", "Tree roots:".dimmed(), stats.roots);

    Ok(())
}

/// Start the Kintree server.
pub async fn serve(ctx: &Context, port: Option<u16>, headless: bool) -> Result<()> {
    let bind_addr = if headless { "0.0.0.0" } else { "127.0.0.1" };
    let port = port.unwrap_or(ctx.config.port);

    if headless {
        println!("{}", "Starting Kintree server in headless mode...".cyan());
    } else {
        println!("{}", "Starting Kintree server...".cyan());
    }

    let addr = format!("{}:{}", bind_addr, port).parse()?;
    let config = ServerConfig { addr };

    println!("{} Listening on ws://{}:{}", "✓".green(), bind_addr, port);
    if headless {
        println!("  Headless mode: accepting connections from any host");
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    match &ctx.snapshot_file {
        Some(path) => {
            let snapshot = Snapshot::load(path)?;
            TreeServer::new(snapshot, config).run().await?;
        }
        None => {
            let store = ctx.open_store()?;
            TreeServer::new(store, config).run().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(root: &Path) -> Context {
        Config::default().save(root).unwrap();
        Context::new(root.to_path_buf(), None).unwrap()
    }

    #[test]
    fn test_init_writes_config() {
        let dir = tempdir().unwrap();
        let ctx = Context::new(dir.path().to_path_buf(), None).unwrap();

        init(&ctx).unwrap();
        assert!(dir.path().join(".kintree").join("config.json").exists());

        // Second run leaves the workspace alone.
        init(&ctx).unwrap();
    }

    #[test]
    fn test_seed_only_fills_empty_store() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        seed(&ctx).unwrap();
        let store = ctx.open_store().unwrap();
        store.remove_member("rohit").unwrap();
        drop(store);

        seed(&ctx).unwrap();
        let snapshot = ctx.snapshot().unwrap();
        assert!(snapshot.member("rohit").is_none());
        assert_eq!(snapshot.members.len(), 9);
    }

    #[test]
    fn test_import_then_export() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let input = dir.path().join("in.json");
        sample_snapshot().save(&input).unwrap();
        import(&ctx, &input).unwrap();

        let output = dir.path().join("out.json");
        export(&ctx, &output).unwrap();
        assert_eq!(Snapshot::load(&output).unwrap(), sample_snapshot());
    }

    #[test]
    fn test_snapshot_file_overrides_store() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("families.json");
        sample_snapshot().save(&file).unwrap();

        let ctx = Context::new(dir.path().to_path_buf(), Some(file)).unwrap();
        assert_eq!(ctx.snapshot().unwrap().members.len(), 10);

        tree(&ctx, None, false).unwrap();
        tree(&ctx, Some("gupta".into()), true).unwrap();
        family(&ctx, "ram", false).unwrap();
        search(&ctx, "शर्मा", None).unwrap();
        relations(&ctx, "amit").unwrap();
        check(&ctx).unwrap();
        status(&ctx).unwrap();
    }

    #[test]
    fn test_unknown_member_is_an_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("families.json");
        sample_snapshot().save(&file).unwrap();
        let ctx = Context::new(dir.path().to_path_buf(), Some(file)).unwrap();

        assert!(family(&ctx, "nobody", false).is_err());
        assert!(relations(&ctx, "nobody").is_err());
    }

    fn fields(id: &str, family: &str, name: &str) -> MemberFields {
        MemberFields {
            id: id.to_string(),
            family: family.to_string(),
            name: name.to_string(),
            age: None,
            occupation: None,
            contact: None,
            gender: None,
        }
    }

    #[test]
    fn test_edit_commands_build_a_family() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        add_family(&ctx, "joshi", "जोशी", Some("पहाड़ी परिवार".into())).unwrap();
        add_member(&ctx, fields("hari", "joshi", "हरि जोशी")).unwrap();
        add_member(
            &ctx,
            MemberFields {
                gender: Some("महिला".into()),
                ..fields("uma", "joshi", "उमा जोशी")
            },
        )
        .unwrap();
        add_member(&ctx, fields("dev", "joshi", "देव जोशी")).unwrap();
        link(&ctx, "hari", "spouse", "uma", None).unwrap();
        link(&ctx, "dev", "Son", "hari", None).unwrap();

        let snapshot = ctx.snapshot().unwrap();
        assert_eq!(snapshot.member("uma").unwrap().gender, Some(Gender::Female));
        assert_eq!(snapshot.relationships[1].id, "dev-son-hari");

        let graph = FamilyGraph::build(snapshot.members, &snapshot.relationships);
        let ids: Vec<_> = graph
            .nuclear_family("hari")
            .members()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["hari", "uma", "dev"]);

        unlink(&ctx, "hari-spouse-uma").unwrap();
        assert!(unlink(&ctx, "hari-spouse-uma").is_err());

        remove_member(&ctx, "dev").unwrap();
        let snapshot = ctx.snapshot().unwrap();
        assert!(snapshot.relationships.is_empty());
        assert_eq!(snapshot.members.len(), 2);
    }

    #[test]
    fn test_edits_refuse_snapshot_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("families.json");
        sample_snapshot().save(&file).unwrap();
        let ctx = Context::new(dir.path().to_path_buf(), Some(file.clone())).unwrap();

        assert!(remove_member(&ctx, "ram").is_err());
        assert!(Snapshot::load(&file).unwrap().member("ram").is_some());
    }

    #[test]
    fn test_add_member_rejects_bad_gender() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let bad = MemberFields {
            gender: Some("unknown".into()),
            ..fields("x", "f1", "X")
        };
        assert!(add_member(&ctx, bad).is_err());
        assert!(ctx.snapshot().unwrap().members.is_empty());
    }

    #[test]
    fn test_commands_on_empty_store() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        tree(&ctx, None, false).unwrap();
        search(&ctx, "ram", Some(5)).unwrap();
        check(&ctx).unwrap();
    }
}
