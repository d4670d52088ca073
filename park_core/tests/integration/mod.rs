mod activation_flow;
mod camera_lifecycle;
mod frame_pipeline;
mod harness;
mod settings_flow;
