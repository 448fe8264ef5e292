//! The module contract and the registry that holds one instance per module.

use std::any::{Any, TypeId};
use std::rc::Rc;

use umod_terminal::{Command, CommandContext, CommandEngine, CommandHandler, OutputDevice};
use umod_types::error::{Result, UmodError};

use crate::config::AgentConfig;
use crate::modules::{
    Agent, ConfigSystem, Downloader, FileSystem, GameLauncher, GamePatcher, GameScanner,
    SteamUpdater,
};
use crate::process::{ProcessSpawner, SystemSpawner};

/// A verb handler inside a module's local table.
pub type Handler<M> = fn(&M, &mut CommandContext, &Command, &mut dyn OutputDevice) -> bool;

/// A subsystem that owns one or more verbs.
pub trait Module: CommandHandler {
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str {
        "0.0.1"
    }

    /// Verbs this module binds, in table order.
    fn verbs(&self) -> Vec<&'static str>;

    /// Print the module banner. Nothing is printed at session start.
    fn print_info(&self, out: &mut dyn OutputDevice, init: bool) {
        if !init {
            out.write_static_line(&format!(
                "$whiteModule $green{} $whiteversion $yellow{}",
                self.name(),
                self.version()
            ));
        }
    }
}

/// Look `cmd` up in a module's own table and run it.
///
/// Returns `false` for verbs the table does not contain.
pub fn dispatch<M>(
    module: &M,
    table: &[(&str, Handler<M>)],
    ctx: &mut CommandContext,
    cmd: &Command,
    out: &mut dyn OutputDevice,
) -> bool {
    table
        .iter()
        .find(|(verb, _)| verb.eq_ignore_ascii_case(cmd.verb()))
        .is_some_and(|(_, handler)| handler(module, ctx, cmd, out))
}

/// Verb names of a module table.
pub fn verbs_of<M>(table: &[(&'static str, Handler<M>)]) -> Vec<&'static str> {
    table.iter().map(|(verb, _)| *verb).collect()
}

struct Entry {
    type_id: TypeId,
    module: Rc<dyn Module>,
    handler: Rc<dyn CommandHandler>,
    any: Rc<dyn Any>,
}

/// Ordered set of modules, at most one per type. Read-only once built.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Entry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard module set for this process.
    pub fn standard(config: &AgentConfig) -> Result<Self> {
        Self::with_parts(config, FileSystem::from_process()?, Rc::new(SystemSpawner))
    }

    /// The standard module set with explicit file-system roots and process
    /// spawner.
    pub fn with_parts(
        config: &AgentConfig,
        file_system: FileSystem,
        spawner: Rc<dyn ProcessSpawner>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        registry.add(Agent)?;
        registry.add(ConfigSystem)?;
        registry.add(Downloader::new(&config.download))?;
        registry.add(file_system)?;
        registry.add(GameLauncher::new(Rc::clone(&spawner)))?;
        registry.add(GamePatcher::new(config.patcher.clone(), Rc::clone(&spawner)))?;
        registry.add(GameScanner)?;
        registry.add(SteamUpdater::new(config.steam.clone(), spawner))?;
        Ok(registry)
    }

    /// Append a module. A second module of the same type is rejected.
    pub fn add<M: Module + 'static>(&mut self, module: M) -> Result<()> {
        let type_id = TypeId::of::<M>();
        if self.entries.iter().any(|e| e.type_id == type_id) {
            return Err(UmodError::Registry(format!(
                "module {} is already registered",
                module.name()
            )));
        }
        let module = Rc::new(module);
        self.entries.push(Entry {
            type_id,
            module: Rc::clone(&module) as Rc<dyn Module>,
            handler: Rc::clone(&module) as Rc<dyn CommandHandler>,
            any: module as Rc<dyn Any>,
        });
        Ok(())
    }

    /// The module of type `T`, if registered.
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.entries
            .iter()
            .find(|e| e.type_id == TypeId::of::<T>())
            .and_then(|e| Rc::clone(&e.any).downcast::<T>().ok())
    }

    /// Modules in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &dyn Module> {
        self.entries.iter().map(|e| &*e.module)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind every module's verbs, in registry order. Fails on the first
    /// verb collision.
    pub fn register_commands(&self, engine: &mut CommandEngine) -> Result<()> {
        for entry in &self.entries {
            for verb in entry.module.verbs() {
                engine.register_handler(verb, Rc::clone(&entry.handler))?;
            }
            log::debug!("registered module {}", entry.module.name());
        }
        Ok(())
    }

    /// Make `registry` reachable from handlers running on `ctx`.
    pub fn install(registry: &Rc<Self>, ctx: &mut CommandContext) {
        ctx.extensions_mut().insert(Rc::clone(registry));
    }
}

/// The registry installed on `ctx`.
pub fn registry(ctx: &CommandContext) -> Option<Rc<ModuleRegistry>> {
    ctx.extensions().get::<Rc<ModuleRegistry>>().map(Rc::clone)
}

/// Typed module lookup through the registry installed on `ctx`.
pub fn module<T: 'static>(ctx: &CommandContext) -> Option<Rc<T>> {
    registry(ctx)?.get::<T>()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use umod_terminal::{BufferConsole, ConsoleOutputDevice};

    use super::*;

    #[derive(Default)]
    struct Probe {
        pings: Cell<u32>,
    }

    impl Probe {
        const COMMANDS: &'static [(&'static str, Handler<Self>)] =
            &[("ping", Self::cmd_ping), ("pong", Self::cmd_ping)];

        fn cmd_ping(&self, _: &mut CommandContext, _: &Command, _: &mut dyn OutputDevice) -> bool {
            self.pings.set(self.pings.get() + 1);
            true
        }
    }

    impl CommandHandler for Probe {
        fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
            dispatch(self, Self::COMMANDS, ctx, cmd, out)
        }
    }

    impl Module for Probe {
        fn name(&self) -> &'static str {
            "Probe"
        }

        fn verbs(&self) -> Vec<&'static str> {
            verbs_of(Self::COMMANDS)
        }
    }

    /// Claims `ping` as well.
    struct Rival;

    impl CommandHandler for Rival {
        fn handle(&self, _: &mut CommandContext, _: &Command, _: &mut dyn OutputDevice) -> bool {
            true
        }
    }

    impl Module for Rival {
        fn name(&self) -> &'static str {
            "Rival"
        }

        fn verbs(&self) -> Vec<&'static str> {
            vec!["PING"]
        }
    }

    fn device() -> ConsoleOutputDevice<BufferConsole> {
        ConsoleOutputDevice::new(BufferConsole::new(60, 10))
    }

    #[test]
    fn dispatch_rejects_foreign_verbs() {
        let probe = Probe::default();
        let mut ctx = CommandContext::new("/");
        let mut out = device();
        assert!(probe.handle(&mut ctx, &Command::parse("PONG"), &mut out));
        assert!(!probe.handle(&mut ctx, &Command::parse("scan"), &mut out));
        assert_eq!(probe.pings.get(), 1);
    }

    #[test]
    fn one_instance_per_type() {
        let mut registry = ModuleRegistry::new();
        registry.add(Probe::default()).unwrap();
        let err = registry.add(Probe::default()).unwrap_err();
        assert!(err.to_string().contains("Probe is already registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn typed_lookup_returns_the_shared_instance() {
        let mut registry = ModuleRegistry::new();
        registry.add(Probe::default()).unwrap();
        let a = registry.get::<Probe>().unwrap();
        a.pings.set(7);
        assert_eq!(registry.get::<Probe>().unwrap().pings.get(), 7);
        assert!(registry.get::<Rival>().is_none());
    }

    #[test]
    fn registered_verbs_route_to_the_module() {
        let mut registry = ModuleRegistry::new();
        registry.add(Probe::default()).unwrap();
        let mut engine = CommandEngine::new();
        registry.register_commands(&mut engine).unwrap();

        let mut ctx = CommandContext::new("/");
        let mut out = device();
        assert!(engine.execute_line(&mut ctx, &mut out, "ping"));
        assert!(engine.execute_line(&mut ctx, &mut out, "pong"));
        assert_eq!(registry.get::<Probe>().unwrap().pings.get(), 2);
    }

    #[test]
    fn verb_collision_across_modules_fails() {
        let mut registry = ModuleRegistry::new();
        registry.add(Probe::default()).unwrap();
        registry.add(Rival).unwrap();
        let mut engine = CommandEngine::new();
        assert!(matches!(
            registry.register_commands(&mut engine),
            Err(UmodError::Registry(_))
        ));
    }

    #[test]
    fn print_info_is_silent_at_init() {
        let probe = Probe::default();
        let mut out = device();
        probe.print_info(&mut out, true);
        assert_eq!(out.len(), 0);
        probe.print_info(&mut out, false);
        assert!(out.console().contains("Module Probe version 0.0.1"));
    }

    #[test]
    fn lookup_through_context() {
        let mut registry = ModuleRegistry::new();
        registry.add(Probe::default()).unwrap();
        let registry = Rc::new(registry);

        let mut ctx = CommandContext::new("/");
        assert!(module::<Probe>(&ctx).is_none());
        ModuleRegistry::install(&registry, &mut ctx);
        assert!(module::<Probe>(&ctx).is_some());
    }

    #[test]
    fn standard_set_order_and_verbs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModuleRegistry::with_parts(
            &AgentConfig::default(),
            FileSystem::new(dir.path(), None),
            Rc::new(SystemSpawner),
        )
        .unwrap();
        let names: Vec<_> = registry.modules().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "Agent",
                "Config",
                "Downloader",
                "FileSystem",
                "GameLauncher",
                "GamePatcher",
                "GameScanner",
                "SteamUpdater"
            ]
        );

        let mut engine = CommandEngine::new();
        registry.register_commands(&mut engine).unwrap();
        for verb in [
            "help", "modules", "echo", "exit", "quit", "fetch", "download", "cd", "dir", "ls",
            "launch", "patch", "scan", "detect", "hash", "md5", "steam", "steamcmd",
        ] {
            assert!(engine.is_registered(verb), "{verb} not registered");
        }
        assert_eq!(engine.verbs().len(), 18);
    }
}
