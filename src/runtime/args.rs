use crate::draw::game::Game;

/// `draw_keeper` takes no flags; everything comes from the environment.
pub fn reject_cli_args<I, S>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let supplied_args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string())
        .collect::<Vec<_>>();
    if !supplied_args.is_empty() {
        return Err(anyhow::anyhow!(
            "CLI arguments are disabled for draw_keeper. Configure .env keys instead (KEEPER_GAMES, KEEPER_DRY_RUN, KEEPER_LOOP). Received args: {}",
            supplied_args.join(" ")
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtlCommand {
    Status { json: bool },
    Pause,
    Resume,
    Trigger,
    /// Zero-winner finalize of a stuck draw that already has a result.
    ForceFinalize {
        game: Game,
        draw_id: u64,
        reason: String,
    },
}

pub const CTL_USAGE: &str = "usage: keeper_ctl <status [--json] | pause | resume | trigger | force-finalize <game> <draw_id> <reason...>>";

pub fn parse_ctl_args<I, S>(args: I) -> anyhow::Result<CtlCommand>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().trim().to_string())
        .collect::<Vec<_>>();
    let Some((command, rest)) = args.split_first() else {
        return Err(anyhow::anyhow!("missing command\n{CTL_USAGE}"));
    };
    let no_extra = |cmd: CtlCommand| {
        if rest.is_empty() {
            Ok(cmd)
        } else {
            Err(anyhow::anyhow!("`{}` takes no arguments\n{CTL_USAGE}", command))
        }
    };
    match command.to_ascii_lowercase().as_str() {
        "status" => match rest {
            [] => Ok(CtlCommand::Status { json: false }),
            [flag] if flag == "--json" => Ok(CtlCommand::Status { json: true }),
            _ => Err(anyhow::anyhow!("unexpected status arguments\n{CTL_USAGE}")),
        },
        "pause" => no_extra(CtlCommand::Pause),
        "resume" => no_extra(CtlCommand::Resume),
        "trigger" => no_extra(CtlCommand::Trigger),
        "force-finalize" | "force_finalize" => {
            let [game, draw_id, reason @ ..] = rest else {
                return Err(anyhow::anyhow!("force-finalize needs <game> <draw_id> <reason>\n{CTL_USAGE}"));
            };
            let game = Game::parse(game).ok_or_else(|| anyhow::anyhow!("unknown game `{game}`"))?;
            let draw_id = draw_id
                .parse::<u64>()
                .map_err(|err| anyhow::anyhow!("invalid draw id `{draw_id}`: {err}"))?;
            let reason = reason.join(" ");
            if reason.trim().is_empty() {
                return Err(anyhow::anyhow!("force-finalize requires a reason"));
            }
            Ok(CtlCommand::ForceFinalize {
                game,
                draw_id,
                reason,
            })
        }
        other => Err(anyhow::anyhow!("unknown command `{other}`\n{CTL_USAGE}")),
    }
}
