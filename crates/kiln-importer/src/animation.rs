use glam::{Quat, Vec3};
use kiln_model::{AnimationInfo, Model, ParameterValue, ROTATION, SCALING, TRANSLATION};
use kiln_scene::{AnimationSample, SceneSource, SourceNode, TransformChannel};

use crate::{ImportContext, ImportError};

const CHANNELS: [TransformChannel; 3] = [
    TransformChannel::Translation,
    TransformChannel::Rotation,
    TransformChannel::Scaling,
];

/// Samples every animated transform channel of the converted nodes into parameter curves.
///
/// Each animation stack becomes one curve name, shared by all parameters it animates. Keys are
/// placed at the key times of the source curve and hold the fully evaluated local transform, so
/// layers are already blended into the result.
pub fn extract_animations<S: SceneSource + ?Sized>(
    scene: &S,
    model: &mut Model,
    context: &ImportContext,
) -> Result<(), ImportError> {
    kiln_profiling::profile_function!();

    for (stack_index, stack) in scene.animation_stacks().iter().enumerate() {
        log::info!("Parsing animation '{}'...", stack.name);

        for layer in &stack.layers {
            for (source, node) in &context.nodes {
                for channel in CHANNELS {
                    let Some(times) = scene.curve_key_times(*source, *layer, channel) else {
                        continue;
                    };
                    log::trace!(
                        "Parsing {:?} animation on node '{}'",
                        channel,
                        model.nodes[*node].name
                    );

                    let (parameter, default) = match channel {
                        TransformChannel::Translation => {
                            (TRANSLATION, ParameterValue::Float3(Vec3::ZERO))
                        }
                        TransformChannel::Rotation => {
                            (ROTATION, ParameterValue::Quaternion(Quat::IDENTITY))
                        }
                        TransformChannel::Scaling => (SCALING, ParameterValue::Float3(Vec3::ONE)),
                    };
                    let curve = model.nodes[*node]
                        .params
                        .find_or_create(parameter, default)
                        .create_curve(&stack.name);

                    for time in times {
                        let value = sample_channel(scene, *source, channel, stack_index, time)?;
                        curve.add(time, &value);
                    }
                }
            }
        }

        model.animations.push(AnimationInfo {
            name: stack.name.clone(),
            start_time: stack.start,
            duration: stack.stop - stack.start,
        });
    }

    Ok(())
}

fn sample_channel<S: SceneSource + ?Sized>(
    scene: &S,
    node: SourceNode,
    channel: TransformChannel,
    stack: usize,
    time: f32,
) -> Result<ParameterValue, ImportError> {
    let local = scene.evaluate_local_transform(node, Some(AnimationSample { stack, time }));

    Ok(match channel {
        TransformChannel::Translation => ParameterValue::Float3(local.translation),
        TransformChannel::Rotation => {
            let rotation =
                local
                    .rotation_quat()
                    .ok_or_else(|| ImportError::UnsupportedRotationOrder {
                        node: scene.node_name(node).to_owned(),
                        order: local.rotation_order,
                    })?;
            ParameterValue::Quaternion(rotation)
        }
        TransformChannel::Scaling => ParameterValue::Float3(local.scaling),
    })
}
