//! Model and wire parsing of packing plans. A plan assigns instance slots
//! to containers; the coordination store delivers it as a string of
//! comma-separated container blocks, each `cid:comp:taskid:idx[:...]`
//! with triplets after the container id.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("malformed container id `{0}`")]
    MalformedContainerId(String),

    #[error("container `{container}` carries {fields} fields after the id, not a positive multiple of 3")]
    MalformedTriplets { container: u32, fields: usize },
}

/// One instance assignment. The task id and component index pass through
/// to the instance argv untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSlot {
    pub component_name: String,
    pub global_task_id: String,
    pub component_index: String,
}

/// Which slots run on which container. Ordered so that equality and
/// iteration are stable across deliveries.
pub type InstanceDistribution = BTreeMap<u32, Vec<InstanceSlot>>;

pub fn parse_distribution(encoded: &str) -> Result<InstanceDistribution, PlanError> {
    let mut distribution = InstanceDistribution::new();
    for block in encoded.split(',') {
        let mut fields = block.split(':');
        // split always yields at least one element
        let raw_cid = fields.next().unwrap_or_default();
        let container: u32 = raw_cid
            .parse()
            .map_err(|_| PlanError::MalformedContainerId(raw_cid.to_string()))?;

        let rest: Vec<&str> = fields.collect();
        if rest.is_empty() || rest.len() % 3 != 0 {
            return Err(PlanError::MalformedTriplets {
                container,
                fields: rest.len(),
            });
        }

        let slots = rest
            .chunks(3)
            .map(|triplet| InstanceSlot {
                component_name: triplet[0].to_string(),
                global_task_id: triplet[1].to_string(),
                component_index: triplet[2].to_string(),
            })
            .collect();
        distribution.insert(container, slots);
    }
    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn slot(component: &str, task: &str, index: &str) -> InstanceSlot {
        InstanceSlot {
            component_name: component.to_string(),
            global_task_id: task.to_string(),
            component_index: index.to_string(),
        }
    }

    #[test]
    fn parses_a_single_container_block() {
        let distribution = parse_distribution("1:word:3:0:consumer:4:0").unwrap();

        assert_eq!(1, distribution.len());
        assert_eq!(
            vec![slot("word", "3", "0"), slot("consumer", "4", "0")],
            distribution[&1]
        );
    }

    #[test]
    fn parses_multiple_container_blocks() {
        let distribution = parse_distribution("1:word:3:0,2:word:5:1").unwrap();

        assert_eq!(vec![slot("word", "3", "0")], distribution[&1]);
        assert_eq!(vec![slot("word", "5", "1")], distribution[&2]);
    }

    #[test]
    fn identical_payloads_parse_equal() {
        let encoded = "1:word:3:0:consumer:4:0,2:word:5:1";
        assert_eq!(
            parse_distribution(encoded).unwrap(),
            parse_distribution(encoded).unwrap()
        );
    }

    #[test]
    fn rejects_a_non_numeric_container_id() {
        assert_matches!(
            parse_distribution("one:word:3:0"),
            Err(PlanError::MalformedContainerId(id)) if id == "one"
        );
    }

    #[test]
    fn rejects_a_bare_container_id() {
        assert_matches!(
            parse_distribution("1"),
            Err(PlanError::MalformedTriplets { container: 1, fields: 0 })
        );
    }

    #[test]
    fn rejects_a_truncated_triplet() {
        assert_matches!(
            parse_distribution("1:word:3:0:consumer:4"),
            Err(PlanError::MalformedTriplets { container: 1, fields: 5 })
        );
    }

    #[test]
    fn rejects_an_empty_payload() {
        assert_matches!(parse_distribution(""), Err(PlanError::MalformedContainerId(_)));
    }
}
