//! gilrs based device backend
//!
//! Converts gilrs events into [`RawDeviceEvent`]s. gilrs reports gamepads by a
//! connection id that is reused after reconnects, so every event is re-keyed by
//! the gamepad UUID before it leaves this module.

use gilrs::{
    Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, GilrsBuilder, MappingSource,
};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::controller::backend::{
    BackendError, DeviceBackend, RawDeviceEvent, HAT_CENTERED, HAT_DOWN, HAT_LEFT, HAT_RIGHT,
    HAT_UP,
};
use crate::controller::device_sampler::{DeviceGuid, DeviceInfo, DeviceKind};

// Channel order exposed for every gilrs gamepad
const AXES: [(Axis, &str); 8] = [
    (Axis::LeftStickX, "Left stick X"),
    (Axis::LeftStickY, "Left stick Y"),
    (Axis::LeftZ, "Left trigger"),
    (Axis::RightStickX, "Right stick X"),
    (Axis::RightStickY, "Right stick Y"),
    (Axis::RightZ, "Right trigger"),
    (Axis::DPadX, "DPad X"),
    (Axis::DPadY, "DPad Y"),
];

const BUTTONS: [Button; 15] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::Start,
    Button::Select,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::LeftThumb,
    Button::RightThumb,
    Button::Mode,
    Button::C,
    Button::Z,
];

pub struct GilrsBackend {
    gilrs: Gilrs,
    guids: HashMap<GamepadId, DeviceGuid>,
    hats: HashMap<GamepadId, u8>,
    announced: bool,
}

impl GilrsBackend {
    pub fn create() -> Result<Self, BackendError> {
        info!("Initializing gilrs controller interface");
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            BackendError::InitializationError(e.to_string())
        })?;
        info!("Successfully initialized gilrs");
        Ok(Self {
            gilrs,
            guids: HashMap::new(),
            hats: HashMap::new(),
            announced: false,
        })
    }

    fn describe(id: GamepadId, gamepad: &Gamepad<'_>) -> DeviceInfo {
        let guid = DeviceGuid::from_bytes(gamepad.uuid());
        let axis_names = AXES.iter().map(|(_, name)| name.to_string()).collect();
        let mut info =
            DeviceInfo::game_controller(guid, gamepad.name(), axis_names, 1, BUTTONS.len());
        if matches!(gamepad.mapping_source(), MappingSource::None) {
            info.kind = DeviceKind::Joystick;
        }
        debug!("Described gamepad {} as {:?}", id, info);
        info
    }

    // Connected gamepads are reported on the first poll, gilrs does not emit events for them
    fn announce_connected(&mut self, events: &mut Vec<RawDeviceEvent>) {
        let gamepads: Vec<(GamepadId, DeviceInfo)> = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| (id, Self::describe(id, &gamepad)))
            .collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, continuing in idle mode");
        }
        for (id, info) in gamepads {
            self.guids.insert(id, info.guid);
            self.hats.insert(id, HAT_CENTERED);
            events.push(RawDeviceEvent::Connected(info));
        }
        self.announced = true;
    }

    fn convert(&mut self, id: GamepadId, event: EventType) -> Option<RawDeviceEvent> {
        match event {
            EventType::Connected => {
                let info = self
                    .gilrs
                    .connected_gamepad(id)
                    .map(|gamepad| Self::describe(id, &gamepad))?;
                self.guids.insert(id, info.guid);
                self.hats.insert(id, HAT_CENTERED);
                Some(RawDeviceEvent::Connected(info))
            }
            EventType::Disconnected => {
                self.hats.remove(&id);
                self.guids.remove(&id).map(RawDeviceEvent::Disconnected)
            }
            EventType::AxisChanged(axis, value, _) => {
                let guid = *self.guids.get(&id)?;
                let index = AXES.iter().position(|(a, _)| *a == axis)?;
                Some(RawDeviceEvent::AxisMotion {
                    guid,
                    axis: index,
                    value,
                })
            }
            EventType::ButtonPressed(button, _) => self.button(id, button, true),
            EventType::ButtonReleased(button, _) => self.button(id, button, false),
            _ => {
                debug!("Unhandled event type: {:?}", event);
                None
            }
        }
    }

    fn button(&mut self, id: GamepadId, button: Button, pressed: bool) -> Option<RawDeviceEvent> {
        let guid = *self.guids.get(&id)?;
        let bit = match button {
            Button::DPadUp => Some(HAT_UP),
            Button::DPadRight => Some(HAT_RIGHT),
            Button::DPadDown => Some(HAT_DOWN),
            Button::DPadLeft => Some(HAT_LEFT),
            _ => None,
        };

        if let Some(bit) = bit {
            let hat = self.hats.entry(id).or_insert(HAT_CENTERED);
            if pressed {
                *hat |= bit;
            } else {
                *hat &= !bit;
            }
            return Some(RawDeviceEvent::HatMotion {
                guid,
                hat: 0,
                value: *hat,
            });
        }

        let index = BUTTONS.iter().position(|b| *b == button)?;
        Some(RawDeviceEvent::Button {
            guid,
            button: index,
            pressed,
        })
    }
}

impl DeviceBackend for GilrsBackend {
    fn name(&self) -> &str {
        "gilrs"
    }

    fn poll(&mut self) -> Vec<RawDeviceEvent> {
        let mut events = Vec::new();
        if !self.announced {
            self.announce_connected(&mut events);
        }

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(raw_event) = self.convert(id, event) {
                events.push(raw_event);
            }
        }
        events
    }

    fn apply_mappings(&mut self, mappings: &str) -> Result<usize, BackendError> {
        let count = crate::controller::mapping_db::count_mappings(mappings);
        let gilrs = GilrsBuilder::new()
            .add_mappings(mappings)
            .build()
            .map_err(|e| BackendError::MappingError(e.to_string()))?;

        // The new context reports its gamepads again
        self.gilrs = gilrs;
        self.guids.clear();
        self.hats.clear();
        self.announced = false;
        info!("Installed {} controller mappings", count);
        Ok(count)
    }
}
