//! Projection of the Instance resource onto its wire message.

use ic_api::{Instance, InstanceState, Player};
use ic_proto::instance::v1 as proto;

use crate::value::{decode_opaque, json_to_struct, ValueError};

/// Build the `cow.instance.v1.Instance` snapshot of `instance`.
///
/// Fails if the opaque sub-state or any player's metadata cannot be
/// transcoded.
pub fn project_instance(instance: &Instance) -> Result<proto::Instance, ValueError> {
    let state = decode_opaque(instance.status.metadata.state.as_bytes())?;

    let players = instance
        .status
        .metadata
        .players
        .iter()
        .map(project_player)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(proto::Instance {
        id: instance.uid().unwrap_or_default().to_string(),
        name: instance.name().to_string(),
        ip: instance.status.ip.clone(),
        state: proto_state(instance.status.state) as i32,
        metadata: Some(proto::Metadata { state, players }),
    })
}

fn project_player(player: &Player) -> Result<proto::Player, ValueError> {
    let metadata = match &player.metadata {
        serde_json::Value::Null => None,
        other => Some(json_to_struct(other)?),
    };
    Ok(proto::Player {
        id: player.id.clone(),
        metadata,
    })
}

/// Map the lifecycle state onto the wire enum. An unset state is `UNKNOWN`.
pub fn proto_state(state: Option<InstanceState>) -> proto::instance::State {
    match state {
        Some(InstanceState::Initializing) => proto::instance::State::Initializing,
        Some(InstanceState::Running) => proto::instance::State::Running,
        Some(InstanceState::Ending) => proto::instance::State::Ending,
        None => proto::instance::State::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::struct_to_json;
    use ic_api::WorkloadSpec;
    use serde_json::json;

    fn running_instance() -> Instance {
        let mut instance = Instance::new("games", "game-7", WorkloadSpec::default());
        instance.stamp_uid("abc");
        instance.status.state = Some(InstanceState::Running);
        instance.status.ip = "10.0.0.5".to_string();
        instance.status.metadata.state = r#"{"map":"dust2","round":3}"#.to_string();
        instance.status.metadata.upsert_player(Player {
            id: "p2".to_string(),
            metadata: json!({ "team": "red" }),
        });
        instance.status.metadata.upsert_player(Player {
            id: "p1".to_string(),
            metadata: serde_json::Value::Null,
        });
        instance
    }

    #[test]
    fn test_projection_is_lossless() {
        let projected = project_instance(&running_instance()).unwrap();

        assert_eq!(projected.id, "abc");
        assert_eq!(projected.name, "game-7");
        assert_eq!(projected.ip, "10.0.0.5");
        assert_eq!(projected.state(), proto::instance::State::Running);

        let metadata = projected.metadata.unwrap();
        assert_eq!(
            struct_to_json(metadata.state.as_ref().unwrap()),
            json!({ "map": "dust2", "round": 3 })
        );

        let ids: Vec<_> = metadata.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert_eq!(
            struct_to_json(metadata.players[0].metadata.as_ref().unwrap()),
            json!({ "team": "red" })
        );
        assert!(metadata.players[1].metadata.is_none());
    }

    #[test]
    fn test_fresh_instance_projects_unknown_state() {
        let instance = Instance::new("games", "game-7", WorkloadSpec::default());
        let projected = project_instance(&instance).unwrap();

        assert_eq!(projected.id, "");
        assert_eq!(projected.state(), proto::instance::State::Unknown);
        assert!(projected.metadata.unwrap().state.is_none());
    }

    #[test]
    fn test_null_state_projects_as_absent() {
        let mut instance = running_instance();
        instance.status.metadata.state = "null".to_string();

        let projected = project_instance(&instance).unwrap();
        assert!(projected.metadata.unwrap().state.is_none());
    }

    #[test]
    fn test_malformed_state_fails() {
        let mut instance = running_instance();
        instance.status.metadata.state = "{not json".to_string();
        assert!(matches!(
            project_instance(&instance),
            Err(ValueError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_scalar_player_metadata_fails() {
        let mut instance = running_instance();
        instance.status.metadata.upsert_player(Player {
            id: "p3".to_string(),
            metadata: json!(17),
        });
        assert_eq!(
            project_instance(&instance).unwrap_err(),
            ValueError::NotAnObject("number")
        );
    }
}
