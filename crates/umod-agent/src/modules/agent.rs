//! Session-level verbs: `help`, `modules`, `echo`, `exit`/`quit`.

use umod_terminal::{Command, CommandContext, CommandHandler, OutputDevice};

use crate::module::{self, Handler, Module, dispatch, verbs_of};

/// Core agent module.
pub struct Agent;

impl Agent {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] = &[
        ("help", Self::cmd_help),
        ("modules", Self::cmd_modules),
        ("echo", Self::cmd_echo),
        ("exit", Self::cmd_exit),
        ("quit", Self::cmd_exit),
    ];

    fn cmd_help(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        let Some(engine) = ctx.engine() else {
            ctx.error_flag = true;
            return true;
        };
        ctx.error_flag = false;
        out.write_static_line("$whiteAvailable commands:");
        out.write_static_line(&format!("$gray{}", engine.verbs().join(", ")));
        true
    }

    fn cmd_modules(&self, ctx: &mut CommandContext, _cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        let Some(registry) = module::registry(ctx) else {
            ctx.error_flag = true;
            return true;
        };
        ctx.error_flag = false;
        for m in registry.modules() {
            m.print_info(out, false);
        }
        true
    }

    fn cmd_echo(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        ctx.error_flag = false;
        out.write_static_line(&cmd.simple_args().join(" "));
        true
    }

    fn cmd_exit(&self, ctx: &mut CommandContext, _cmd: &Command, _out: &mut dyn OutputDevice) -> bool {
        ctx.error_flag = false;
        ctx.terminate = true;
        true
    }
}

impl CommandHandler for Agent {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for Agent {
    fn name(&self) -> &'static str {
        "Agent"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
