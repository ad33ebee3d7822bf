//! Ahead-of-time compilation of the binding graph into a specialized,
//! reflection-free resolver.
//!
//! Rust already never reflects at runtime — every factory closure is
//! ordinary code. What this module does instead is the part of §4.8 that
//! *is* meaningful here: decide which bindings are statically compilable
//! (walking declared [`crate::introspector::DependencySpec`] edges),
//! produce deterministic textual Rust source for a specialized registration
//! function, fingerprint the normalized registry state with SHA-256, and
//! emit the result atomically.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{DiError, DiResult};
use crate::introspector::DependencySpec;
use crate::key::Key;

/// One binding as seen by the compiler, already extracted from the live
/// registry (the compiler itself never touches locks).
#[derive(Clone)]
pub struct BindingSummary {
    pub key: Key,
    pub shared: bool,
    /// Stable textual identity of the concrete producer (class path, or a
    /// closure's file/line if it's a factory) — part of the fingerprint.
    pub concrete_identity: String,
    pub dependency_spec: Option<DependencySpec>,
}

/// Everything the compiler needs, pre-extracted from a live container.
pub struct CompilerInput {
    pub bindings: Vec<BindingSummary>,
    pub aliases: Vec<(Key, Key)>,
    /// `(consumer, needed, implementation description)`.
    pub contextual: Vec<(Key, Key, String)>,
    pub decorated_keys: HashSet<Key>,
    pub tagged_keys: HashSet<Key>,
    pub module_path: String,
}

/// Why a candidate binding was not compiled.
#[derive(Debug, Clone)]
pub enum SkipReason {
    NoDependencySpec,
    HasDecorators,
    IsContextualTarget,
    IsTagged,
    UnresolvableDependency(Key),
    Cycle,
    /// The key's type name isn't a plain Rust item path (generics,
    /// references, tuples, trait objects, closures, ...), so generated
    /// source can't name it to reconstruct a matching `TypeId`.
    UnrepresentableKey,
}

/// Result of a compile pass.
pub struct CompileReport {
    pub compiled: Vec<Key>,
    pub skipped: Vec<(Key, SkipReason)>,
    pub fingerprint: [u8; 32],
    pub source: String,
}

/// Deterministic FNV-1a hash, used to name generated factory functions
/// reproducibly without depending on `HashMap` iteration order.
fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn factory_name(key: &Key) -> String {
    format!("factory_{:016x}", fnv1a(key.display_name()))
}

/// True if `name` (a `std::any::type_name::<T>()` string) is a plain item
/// path usable as a type in generated source — no generics, references,
/// tuples, slices, or trait objects, any of which would need machinery this
/// module doesn't have to render correctly.
fn is_plain_type_path(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        && name.split("::").all(|seg| !seg.is_empty())
}

/// Renders a `Key` as a Rust expression that reconstructs an equal `Key` at
/// the generated file's own compile time. `Key::Type`/`Key::TypeNamed` need
/// a real `TypeId`, which can only come from `TypeId::of::<ActualPath>()` —
/// so those variants are only representable when their name is a plain type
/// path; the trait-keyed variants carry no `TypeId` and are always
/// representable directly from their strings.
fn key_literal(key: &Key) -> Option<String> {
    match key {
        Key::Type(_, name) => is_plain_type_path(name).then(|| {
            format!("ferrous_di::key::Key::Type(::std::any::TypeId::of::<{name}>(), {name:?})")
        }),
        Key::Trait(name) => Some(format!("ferrous_di::key::Key::Trait({name:?})")),
        Key::MultiTrait(name, idx) => {
            Some(format!("ferrous_di::key::Key::MultiTrait({name:?}, {idx})"))
        }
        Key::TypeNamed(_, tyname, name) => is_plain_type_path(tyname).then(|| {
            format!(
                "ferrous_di::key::Key::TypeNamed(::std::any::TypeId::of::<{tyname}>(), {tyname:?}, {name:?})"
            )
        }),
        Key::TraitNamed(tr, name) => {
            Some(format!("ferrous_di::key::Key::TraitNamed({tr:?}, {name:?})"))
        }
        Key::MultiTraitNamed(tr, name, idx) => {
            Some(format!("ferrous_di::key::Key::MultiTraitNamed({tr:?}, {name:?}, {idx})"))
        }
    }
}

/// Plans which bindings are compilable, depth-first, aborting only the
/// binding whose walk hits a cycle or an unresolvable dependency — not the
/// whole compile.
fn plan(input: &CompilerInput) -> (Vec<Key>, Vec<(Key, SkipReason)>) {
    let by_key: HashMap<&Key, &BindingSummary> = input.bindings.iter().map(|b| (&b.key, b)).collect();
    let contextual_targets: HashSet<&Key> = input.contextual.iter().map(|(_, needed, _)| needed).collect();

    let mut compiled = Vec::new();
    let mut skipped = Vec::new();

    'outer: for binding in &input.bindings {
        if input.decorated_keys.contains(&binding.key) {
            skipped.push((binding.key.clone(), SkipReason::HasDecorators));
            continue;
        }
        if contextual_targets.contains(&binding.key) {
            skipped.push((binding.key.clone(), SkipReason::IsContextualTarget));
            continue;
        }
        if input.tagged_keys.contains(&binding.key) {
            skipped.push((binding.key.clone(), SkipReason::IsTagged));
            continue;
        }
        if key_literal(&binding.key).is_none() {
            skipped.push((binding.key.clone(), SkipReason::UnrepresentableKey));
            continue;
        }
        let Some(spec) = &binding.dependency_spec else {
            skipped.push((binding.key.clone(), SkipReason::NoDependencySpec));
            continue;
        };

        let mut visiting = HashSet::new();
        let mut stack = vec![(binding.key.clone(), spec.depends_on.clone())];
        visiting.insert(binding.key.clone());
        while let Some((_current, deps)) = stack.pop() {
            for dep in deps {
                if dep == binding.key || visiting.contains(&dep) {
                    skipped.push((binding.key.clone(), SkipReason::Cycle));
                    continue 'outer;
                }
                match by_key.get(&dep) {
                    Some(dep_binding) => {
                        visiting.insert(dep.clone());
                        if let Some(dep_spec) = &dep_binding.dependency_spec {
                            stack.push((dep.clone(), dep_spec.depends_on.clone()));
                        }
                    }
                    None => {
                        skipped.push((binding.key.clone(), SkipReason::UnresolvableDependency(dep)));
                        continue 'outer;
                    }
                }
            }
        }

        compiled.push(binding.key.clone());
    }

    (compiled, skipped)
}

/// SHA-256 fingerprint over normalized, sorted registry state. Two
/// semantically-equal registries (same bindings/aliases/contextual entries,
/// any registration order) hash identically.
fn fingerprint(input: &CompilerInput) -> [u8; 32] {
    let mut lines: Vec<String> = input
        .bindings
        .iter()
        .map(|b| format!("bind|{}|{}|{}", b.key.display_name(), b.shared, b.concrete_identity))
        .collect();
    lines.extend(
        input
            .aliases
            .iter()
            .map(|(a, t)| format!("alias|{}|{}", a.display_name(), t.display_name())),
    );
    lines.extend(
        input
            .contextual
            .iter()
            .map(|(c, n, imp)| format!("ctx|{}|{}|{}", c.display_name(), n.display_name(), imp)),
    );
    lines.sort();
    lines.push(format!("module|{}", input.module_path));

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().into()
}

fn render_source(input: &CompilerInput, compiled: &[Key], fp: &[u8; 32], generated_at: &str) -> String {
    let by_key: HashMap<&Key, &BindingSummary> = input.bindings.iter().map(|b| (&b.key, b)).collect();

    let mut out = String::new();
    out.push_str("// Auto-generated by ferrous_di::compiler. Do not edit by hand.\n");
    out.push_str(&format!("pub const GENERATED_AT: &str = {generated_at:?};\n"));
    out.push_str(&format!(
        "pub const FINGERPRINT: [u8; 32] = {:?};\n",
        fp
    ));
    out.push_str(&format!("pub const TOTAL_BINDINGS: usize = {};\n", input.bindings.len()));
    out.push_str(&format!("pub const COMPILED_BINDINGS: usize = {};\n", compiled.len()));
    out.push_str(&format!("pub const ALIAS_COUNT: usize = {};\n", input.aliases.len()));
    out.push_str(&format!("pub const CONTEXTUAL_COUNT: usize = {};\n\n", input.contextual.len()));

    // Each compiled factory forwards to the source provider's own binding,
    // keyed by the binding's real identity rather than a synthesized one —
    // the new provider gets its own cache entry, but the first resolution
    // goes through `source`'s existing constructor.
    for key in compiled {
        let Some(literal) = key_literal(key) else { continue };
        out.push_str(&format!(
            "/// Compiled factory for `{}`.\npub fn {}(source: &ferrous_di::ServiceProvider) -> ferrous_di::DiResult<::std::sync::Arc<dyn ::std::any::Any + Send + Sync>> {{\n    ferrous_di::traits::ResolverCore::resolve_any(source, &{})\n}}\n\n",
            key.display_name(),
            factory_name(key),
            literal,
        ));
    }

    out.push_str("/// Re-registers every compiled binding (respecting `shared`) into `collection`,\n");
    out.push_str("/// each forwarding to the matching binding on `source`.\n");
    out.push_str("pub fn register(collection: &mut ferrous_di::ServiceCollection, source: &ferrous_di::ServiceProvider) {\n");
    for key in compiled {
        let Some(literal) = key_literal(key) else { continue };
        let shared = by_key.get(key).map(|b| b.shared).unwrap_or(false);
        let lifetime = if shared { "Singleton" } else { "Transient" };
        out.push_str(&format!(
            "    {{\n        let source = source.clone();\n        collection.add_erased({literal}, ferrous_di::lifetime::Lifetime::{lifetime}, move |_resolver| {}(&source));\n    }}\n",
            factory_name(key),
        ));
    }
    out.push_str("}\n\n");

    out.push_str("/// Re-applies every alias and every reconstructable contextual binding onto\n");
    out.push_str("/// `target`. Must run after `target` is built from the collection `register`\n");
    out.push_str("/// populated, since aliases and contextual bindings are provider-level, not\n");
    out.push_str("/// collection-level, state.\n");
    out.push_str("pub fn apply_aliases_and_contextual(target: &ferrous_di::ServiceProvider) {\n");
    for (alias, aliased_to) in &input.aliases {
        let (Some(alias_lit), Some(target_lit)) = (key_literal(alias), key_literal(aliased_to)) else {
            continue;
        };
        out.push_str(&format!("    target.alias({alias_lit}, {target_lit});\n"));
    }
    for (consumer, needed, description) in &input.contextual {
        if !description.starts_with("class:") {
            // Factory/tagged/configured implementations aren't reconstructable
            // from their recorded description alone; only class-delegation
            // contextual bindings can be replayed here.
            continue;
        }
        let Some(target_lit) = description
            .strip_prefix("class:")
            .and_then(|class_name| is_plain_type_path(class_name).then_some(class_name))
            .map(|class_name| {
                format!("ferrous_di::key::Key::Type(::std::any::TypeId::of::<{class_name}>(), {class_name:?})")
            })
        else {
            continue;
        };
        let (Some(consumer_lit), Some(needed_lit)) = (key_literal(consumer), key_literal(needed)) else {
            continue;
        };
        out.push_str(&format!(
            "    target.when({consumer_lit}).needs({needed_lit}).give({target_lit}).expect(\"contextual rebinding is always well-formed here\");\n"
        ));
    }
    out.push_str("}\n");
    out
}

/// Runs the full compile pass: plans compilable bindings, computes the
/// fingerprint, and renders deterministic source text. Does not touch the
/// filesystem — see [`emit_atomically`].
pub fn compile(input: &CompilerInput, generated_at: &str) -> CompileReport {
    let (compiled, skipped) = plan(input);
    let fp = fingerprint(input);
    let source = render_source(input, &compiled, &fp, generated_at);
    CompileReport { compiled, skipped, fingerprint: fp, source }
}

/// Computes only the fingerprint, without planning or rendering — used by
/// `CompilationFingerprint()` so callers can detect drift cheaply.
pub fn compute_fingerprint(input: &CompilerInput) -> [u8; 32] {
    fingerprint(input)
}

/// Atomically writes `source` to `path`: exclusive lock-file creation, write
/// to a uniquely-named temp file in the same directory, rename onto the
/// final path. On any failure `path` is left unchanged and the lock/temp
/// files are removed.
pub fn emit_atomically(path: &Path, source: &str, unique_suffix: u64) -> DiResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| DiError::CompilationFailed(format!("create_dir_all({dir:?}): {e}")))?;

    let lock_path = {
        let mut p = path.to_path_buf();
        let mut name = p.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        p.set_file_name(name);
        p
    };

    let _lock = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| DiError::CompilationFailed(format!("lock {lock_path:?} already held: {e}")))?;

    let temp_path = {
        let mut p = path.to_path_buf();
        let mut name = p.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".tmp.{unique_suffix}"));
        p.set_file_name(name);
        p
    };

    let guard = EmitGuard { lock_path: lock_path.clone(), temp_path: Some(temp_path.clone()) };
    let result = (|| -> DiResult<PathBuf> {
        let mut f: File = File::create(&temp_path)
            .map_err(|e| DiError::CompilationFailed(format!("create temp {temp_path:?}: {e}")))?;
        f.write_all(source.as_bytes())
            .map_err(|e| DiError::CompilationFailed(format!("write temp {temp_path:?}: {e}")))?;
        f.sync_all().ok();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o644));
        }

        fs::rename(&temp_path, path)
            .map_err(|e| DiError::CompilationFailed(format!("rename {temp_path:?} -> {path:?}: {e}")))?;
        Ok(temp_path)
    })();

    drop(guard);
    result.map(|_| ())
}

struct EmitGuard {
    lock_path: PathBuf,
    temp_path: Option<PathBuf>,
}

impl Drop for EmitGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
        if let Some(t) = &self.temp_path {
            let _ = fs::remove_file(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    fn sample_input() -> CompilerInput {
        let a = key_of_type::<u32>();
        let b = key_of_type::<u64>();
        CompilerInput {
            bindings: vec![
                BindingSummary {
                    key: a.clone(),
                    shared: true,
                    concrete_identity: "A".to_string(),
                    dependency_spec: Some(DependencySpec::new(vec![b.clone()])),
                },
                BindingSummary {
                    key: b.clone(),
                    shared: false,
                    concrete_identity: "B".to_string(),
                    dependency_spec: Some(DependencySpec::new(vec![])),
                },
            ],
            aliases: vec![],
            contextual: vec![],
            decorated_keys: HashSet::new(),
            tagged_keys: HashSet::new(),
            module_path: "test_module".to_string(),
        }
    }

    #[test]
    fn compiles_bindings_with_full_dependency_specs() {
        let input = sample_input();
        let report = compile(&input, "2026-01-01T00:00:00Z");
        assert_eq!(report.compiled.len(), 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let mut input = sample_input();
        let fp1 = compute_fingerprint(&input);
        input.bindings.reverse();
        let fp2 = compute_fingerprint(&input);
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn fingerprint_changes_on_semantic_change() {
        let input = sample_input();
        let fp1 = compute_fingerprint(&input);
        let mut changed = sample_input();
        changed.bindings[0].shared = false;
        let fp2 = compute_fingerprint(&changed);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn missing_dependency_spec_is_skipped_not_fatal() {
        let mut input = sample_input();
        input.bindings[1].dependency_spec = None;
        let report = compile(&input, "now");
        assert_eq!(report.compiled.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].1, SkipReason::NoDependencySpec));
    }

    #[test]
    fn cycle_aborts_only_that_binding() {
        let a = key_of_type::<u32>();
        let b = key_of_type::<u64>();
        let input = CompilerInput {
            bindings: vec![
                BindingSummary {
                    key: a.clone(),
                    shared: false,
                    concrete_identity: "A".into(),
                    dependency_spec: Some(DependencySpec::new(vec![b.clone()])),
                },
                BindingSummary {
                    key: b.clone(),
                    shared: false,
                    concrete_identity: "B".into(),
                    dependency_spec: Some(DependencySpec::new(vec![a.clone()])),
                },
            ],
            aliases: vec![],
            contextual: vec![],
            decorated_keys: HashSet::new(),
            tagged_keys: HashSet::new(),
            module_path: "m".into(),
        };
        let report = compile(&input, "now");
        assert!(report.compiled.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn generic_type_keys_are_skipped_as_unrepresentable() {
        let key = key_of_type::<Option<u32>>();
        let input = CompilerInput {
            bindings: vec![BindingSummary {
                key: key.clone(),
                shared: true,
                concrete_identity: "Option<u32>".into(),
                dependency_spec: Some(DependencySpec::new(vec![])),
            }],
            aliases: vec![],
            contextual: vec![],
            decorated_keys: HashSet::new(),
            tagged_keys: HashSet::new(),
            module_path: "m".into(),
        };
        let report = compile(&input, "now");
        assert!(report.compiled.is_empty());
        assert!(matches!(report.skipped[0].1, SkipReason::UnrepresentableKey));
    }

    #[test]
    fn generated_source_keys_factories_by_real_identity_not_unit_type() {
        let input = sample_input();
        let report = compile(&input, "now");
        assert!(!report.source.contains("TypeId::of::<()>()"));
        assert!(report.source.contains("TypeId::of::<u32>()"));
        assert!(report.source.contains("TypeId::of::<u64>()"));
    }

    #[test]
    fn generated_register_forwards_every_compiled_binding() {
        let input = sample_input();
        let report = compile(&input, "now");
        assert_eq!(report.compiled.len(), 2);
        let register_body = report.source.split("pub fn register(").nth(1).unwrap();
        assert_eq!(register_body.matches("collection.add_erased(").count(), 2);
        assert!(register_body.contains("Lifetime::Singleton"));
        assert!(register_body.contains("Lifetime::Transient"));
    }

    #[test]
    fn generated_source_reapplies_aliases() {
        let mut input = sample_input();
        let a = key_of_type::<u32>();
        let b = key_of_type::<u64>();
        input.aliases.push((a, b));
        let report = compile(&input, "now");
        assert!(report.source.contains("target.alias("));
    }

    #[test]
    fn atomic_emit_writes_file_and_cleans_up() {
        let dir = std::env::temp_dir().join(format!("ferrous_di_compiler_test_{:x}", fnv1a("atomic_emit_writes_file_and_cleans_up")));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("compiled.rs");
        emit_atomically(&path, "// generated\n", 1).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("rs.lock").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn atomic_emit_leaves_existing_file_untouched_on_lock_contention() {
        let dir = std::env::temp_dir().join(format!("ferrous_di_compiler_test_{:x}", fnv1a("atomic_emit_leaves_existing_file_untouched_on_lock_contention")));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("compiled.rs");
        fs::write(&path, "previous").unwrap();
        let lock_path = dir.join("compiled.rs.lock");
        let _held = File::create(&lock_path).unwrap();
        // second lock attempt must fail since the file already exists
        let result = OpenOptions::new().write(true).create_new(true).open(&lock_path);
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        let _ = fs::remove_dir_all(&dir);
    }
}
