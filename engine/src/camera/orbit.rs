use {
    super::view::{CameraView, OrbitAngles},
    crate::{
        bounds::{BoundingVolume, MIN_EXTENT},
        config::OrbitConfig,
    },
    nalgebra as na,
};

const FULL_TURN: f32 = 360.0;
const MAX_PITCH: f32 = 90.0;

const PAN_DISTANCE_FACTOR: f32 = 0.002;
const ZOOM_DISTANCE_FACTOR: f32 = 0.01;

/// Extra distance added when framing, relative to object size.
const FIT_MARGIN: f32 = 0.1;
const MIN_DISTANCE_FACTOR: f32 = 0.01;
const MAX_DISTANCE_FACTOR: f32 = 100.0;

const MIN_FIELD_OF_VIEW: f32 = 1.0;
const MAX_FIELD_OF_VIEW: f32 = 179.0;

/// Upper end of the smoothness setting.
pub const MAX_SMOOTHNESS: f32 = 5.0;
const FASTEST_FOLLOW: f32 = 10.0;
const SLOWEST_FOLLOW: f32 = 1.0;

/// Smoothed orbit camera.
///
/// Input moves the destination state, and every update eases current state
/// towards it. Must be updated once per frame.
#[derive(Clone, Debug)]
pub struct OrbitCameraRig {
    current_rotation: OrbitAngles,
    dest_rotation: OrbitAngles,
    current_pivot: na::Vector3<f32>,
    dest_pivot: na::Vector3<f32>,
    current_distance: f32,
    dest_distance: f32,
    current_fov: f32,
    dest_fov: f32,
    min_distance: f32,
    max_distance: f32,

    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    smoothness: f32,

    auto_rotate: bool,
    auto_rotate_speed: f32,
}

impl OrbitCameraRig {
    pub fn new(config: &OrbitConfig) -> Self {
        let fov = sanitize_fov(config.field_of_view).unwrap_or(30.0);

        OrbitCameraRig {
            current_rotation: OrbitAngles::default(),
            dest_rotation: OrbitAngles::default(),
            current_pivot: na::Vector3::zeros(),
            dest_pivot: na::Vector3::zeros(),
            current_distance: 5.0,
            dest_distance: 5.0,
            current_fov: fov,
            dest_fov: fov,
            min_distance: 0.01,
            max_distance: 1000.0,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            smoothness: clamp_smoothness(config.smoothness),
            auto_rotate: config.auto_rotate,
            auto_rotate_speed: config.auto_rotate_speed,
        }
    }

    /// Applies one frame of pointer input and advances smoothing by `dt`
    /// seconds.
    pub fn update_from_input(
        &mut self,
        rotate_delta: na::Vector2<f32>,
        pan_delta: na::Vector2<f32>,
        zoom_delta: f32,
        dt: f32,
    ) {
        let dt = finite_or_zero(dt).max(0.0);

        let rotate = sanitize2(rotate_delta) * self.rotate_speed;
        let mut yaw = self.dest_rotation.yaw + rotate.x;
        if self.auto_rotate {
            yaw += self.auto_rotate_speed * dt;
        }
        self.set_dest_yaw(yaw);
        self.dest_rotation.pitch =
            clamp_pitch(self.dest_rotation.pitch + rotate.y);

        let pan = sanitize2(pan_delta)
            * self.pan_speed
            * self.current_distance
            * PAN_DISTANCE_FACTOR;
        if pan != na::Vector2::zeros() {
            let offset = self.current_rotation.to_rotation()
                * na::Vector3::new(pan.x, pan.y, 0.0);
            self.dest_pivot += offset;
        }

        let zoom = finite_or_zero(zoom_delta);
        self.dest_distance += zoom
            * self.zoom_speed
            * ZOOM_DISTANCE_FACTOR
            * self.dest_distance.abs();
        self.dest_distance = self.clamp_distance(self.dest_distance);

        self.advance(dt);
    }

    /// Eases current state towards destination.
    fn advance(&mut self, dt: f32) {
        let t = (dt * self.smooth_factor()).min(1.0).max(0.0);

        self.current_rotation.yaw =
            lerp(self.current_rotation.yaw, self.dest_rotation.yaw, t);
        self.current_rotation.pitch =
            lerp(self.current_rotation.pitch, self.dest_rotation.pitch, t);
        self.current_pivot = self.current_pivot.lerp(&self.dest_pivot, t);
        self.current_distance = self.clamp_distance(lerp(
            self.current_distance,
            self.dest_distance,
            t,
        ));
        self.current_fov = lerp(self.current_fov, self.dest_fov, t);
    }

    /// Frames `bounds` fully with a margin and rescales the zoom range to
    /// the object's size.
    pub fn fit_to_bounds(&mut self, bounds: &BoundingVolume, fov_degrees: f32) {
        let bounds = match bounds.non_degenerate() {
            Ok(bounds) => bounds,
            Err(err) => {
                tracing::debug!("{}, framing minimal extent", err);
                BoundingVolume::new(
                    if bounds.center.iter().all(|c| c.is_finite()) {
                        bounds.center
                    } else {
                        self.dest_pivot
                    },
                    na::Vector3::repeat(MIN_EXTENT),
                )
            }
        };

        let extent = bounds.largest_extent().max(MIN_EXTENT);
        let fov = sanitize_fov(fov_degrees).unwrap_or(self.dest_fov);
        let half_fov = (0.5 * fov).to_radians();
        let fit_distance =
            (extent * 2.0) / (2.0 * half_fov.tan()) + FIT_MARGIN * extent;

        self.min_distance = fit_distance * MIN_DISTANCE_FACTOR;
        self.max_distance = (extent * MAX_DISTANCE_FACTOR).max(fit_distance);
        self.dest_pivot = bounds.center;
        self.dest_distance = fit_distance;
        self.current_distance = self.clamp_distance(self.current_distance);

        tracing::debug!(
            "Framed bounds at {:?} from distance {}",
            bounds.center,
            fit_distance
        );
    }

    /// Starts transition to the saved view.
    pub fn apply_view(&mut self, view: &CameraView) {
        self.set_dest_yaw(finite_or_zero(view.rotation.yaw));
        self.dest_rotation.pitch = clamp_pitch(view.rotation.pitch);
        if view.pivot.iter().all(|c| c.is_finite()) {
            self.dest_pivot = view.pivot;
        }
        if view.distance.is_finite() {
            self.dest_distance = self.clamp_distance(view.distance);
        }
        if let Some(fov) = sanitize_fov(view.field_of_view) {
            self.dest_fov = fov;
        }

        tracing::debug!("Applying view `{}`", view.name);
    }

    pub fn capture_view(&self, name: impl Into<String>) -> CameraView {
        CameraView {
            name: name.into(),
            rotation: self.dest_rotation,
            distance: self.dest_distance,
            pivot: self.dest_pivot,
            field_of_view: self.dest_fov,
        }
    }

    /// Camera position and orientation from current state.
    /// Camera looks along its local +Z towards the pivot.
    pub fn compute_world_transform(
        &self,
    ) -> (na::Vector3<f32>, na::UnitQuaternion<f32>) {
        let rotation = self.current_rotation.to_rotation();
        let position = self.current_pivot
            - rotation * na::Vector3::z() * self.current_distance;
        (position, rotation)
    }

    pub fn isometry(&self) -> na::Isometry3<f32> {
        let (position, rotation) = self.compute_world_transform();
        na::Isometry3::from_parts(na::Translation3::from(position), rotation)
    }

    /// Jumps current state to destination.
    pub fn snap(&mut self) {
        self.current_rotation = self.dest_rotation;
        self.current_pivot = self.dest_pivot;
        self.current_distance = self.clamp_distance(self.dest_distance);
        self.current_fov = self.dest_fov;
    }

    pub fn set_field_of_view(&mut self, fov_degrees: f32) {
        if let Some(fov) = sanitize_fov(fov_degrees) {
            self.dest_fov = fov;
        }
    }

    pub fn set_smoothness(&mut self, smoothness: f32) {
        self.smoothness = clamp_smoothness(smoothness);
    }

    pub fn set_auto_rotate(&mut self, enabled: bool, degrees_per_second: f32) {
        self.auto_rotate = enabled;
        self.auto_rotate_speed = finite_or_zero(degrees_per_second);
    }

    pub fn current_rotation(&self) -> OrbitAngles {
        self.current_rotation
    }

    pub fn dest_rotation(&self) -> OrbitAngles {
        self.dest_rotation
    }

    pub fn current_pivot(&self) -> na::Vector3<f32> {
        self.current_pivot
    }

    pub fn dest_pivot(&self) -> na::Vector3<f32> {
        self.dest_pivot
    }

    pub fn current_distance(&self) -> f32 {
        self.current_distance
    }

    pub fn dest_distance(&self) -> f32 {
        self.dest_distance
    }

    pub fn current_fov(&self) -> f32 {
        self.current_fov
    }

    pub fn dest_fov(&self) -> f32 {
        self.dest_fov
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn smoothness(&self) -> f32 {
        self.smoothness
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    /// Interpolation rate. Higher smoothness setting gives slower follow.
    fn smooth_factor(&self) -> f32 {
        lerp(FASTEST_FOLLOW, SLOWEST_FOLLOW, self.smoothness * 0.2)
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        distance.min(self.max_distance).max(self.min_distance)
    }

    /// Wraps yaw into `[-360, 360]`, shifting current yaw by the same turn
    /// so easing never takes the long way round.
    fn set_dest_yaw(&mut self, mut yaw: f32) {
        let unwrapped = yaw;

        if yaw < -FULL_TURN {
            yaw -= (yaw / FULL_TURN).ceil() * FULL_TURN;
        }

        if yaw > FULL_TURN {
            yaw -= (yaw / FULL_TURN).floor() * FULL_TURN;
        }

        self.current_rotation.yaw += yaw - unwrapped;
        self.dest_rotation.yaw = yaw;
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.min(1.0).max(0.0);
    a + (b - a) * t
}

fn clamp_pitch(pitch: f32) -> f32 {
    finite_or_zero(pitch).min(MAX_PITCH).max(-MAX_PITCH)
}

fn clamp_smoothness(smoothness: f32) -> f32 {
    finite_or_zero(smoothness).min(MAX_SMOOTHNESS).max(0.0)
}

fn sanitize_fov(fov: f32) -> Option<f32> {
    if fov.is_finite() {
        Some(fov.min(MAX_FIELD_OF_VIEW).max(MIN_FIELD_OF_VIEW))
    } else {
        None
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn sanitize2(v: na::Vector2<f32>) -> na::Vector2<f32> {
    v.map(finite_or_zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn rig() -> OrbitCameraRig {
        OrbitCameraRig::new(&OrbitConfig::default())
    }

    fn unit_cube() -> BoundingVolume {
        BoundingVolume::new(na::Vector3::zeros(), na::Vector3::repeat(1.0))
    }

    fn idle(rig: &mut OrbitCameraRig, frames: usize) {
        for _ in 0..frames {
            rig.update_from_input(
                na::Vector2::zeros(),
                na::Vector2::zeros(),
                0.0,
                1.0 / 60.0,
            );
        }
    }

    #[test]
    fn fit_to_bounds_distance_is_pinned() {
        let mut rig = rig();
        rig.fit_to_bounds(&unit_cube(), 30.0);

        // 1 / tan(15 deg) + 0.1
        let expected = 3.832_050_8;
        assert!((rig.dest_distance() - expected).abs() < EPSILON);
        assert_eq!(rig.dest_pivot(), na::Vector3::zeros());
        assert!((rig.min_distance() - expected * 0.01).abs() < EPSILON);
        assert!((rig.max_distance() - 100.0).abs() < EPSILON);
    }

    #[test]
    fn fit_to_degenerate_bounds_uses_minimal_extent() {
        let mut rig = rig();
        let point = BoundingVolume::new(
            na::Vector3::new(1.0, 2.0, 3.0),
            na::Vector3::zeros(),
        );
        rig.fit_to_bounds(&point, 30.0);

        assert!(rig.dest_distance().is_finite());
        assert!(rig.dest_distance() > 0.0);
        assert_eq!(rig.dest_pivot(), na::Vector3::new(1.0, 2.0, 3.0));
        assert!(rig.min_distance() <= rig.max_distance());

        let nan = BoundingVolume::new(
            na::Vector3::repeat(f32::NAN),
            na::Vector3::repeat(f32::NAN),
        );
        rig.fit_to_bounds(&nan, f32::NAN);
        assert!(rig.dest_distance().is_finite());
        assert!(rig.dest_pivot().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn distance_stays_within_range() {
        let mut rig = rig();
        rig.fit_to_bounds(&unit_cube(), 30.0);

        let zooms = [500.0, -500.0, 1e6, -1e6, 0.0, 42.0, -99.0, f32::NAN];
        for (i, &zoom) in zooms.iter().cycle().take(400).enumerate() {
            let dt = if i % 7 == 0 { 0.5 } else { 1.0 / 60.0 };
            rig.update_from_input(
                na::Vector2::zeros(),
                na::Vector2::zeros(),
                zoom,
                dt,
            );
            assert!(rig.min_distance() <= rig.current_distance());
            assert!(rig.current_distance() <= rig.max_distance());
        }
    }

    #[test]
    fn refit_clamps_current_distance_immediately() {
        let mut rig = rig();
        rig.fit_to_bounds(&unit_cube(), 30.0);
        rig.snap();

        let small = BoundingVolume::new(
            na::Vector3::zeros(),
            na::Vector3::repeat(0.01),
        );
        rig.fit_to_bounds(&small, 30.0);
        assert!(rig.current_distance() <= rig.max_distance());
    }

    #[test]
    fn yaw_wraps_and_pitch_clamps() {
        let mut rig = rig();
        let deltas = [
            na::Vector2::new(250.0, 40.0),
            na::Vector2::new(250.0, 40.0),
            na::Vector2::new(-900.0, -300.0),
            na::Vector2::new(1234.5, 10.0),
            na::Vector2::new(-0.5, 500.0),
        ];

        for _ in 0..20 {
            for delta in deltas.iter() {
                rig.update_from_input(
                    *delta,
                    na::Vector2::zeros(),
                    0.0,
                    1.0 / 60.0,
                );
                let dest = rig.dest_rotation();
                assert!(dest.yaw >= -360.0 && dest.yaw <= 360.0);
                assert!(dest.pitch >= -90.0 && dest.pitch <= 90.0);
            }
        }
    }

    #[test]
    fn wrapping_keeps_current_yaw_close_to_destination() {
        let mut rig = rig();
        rig.update_from_input(
            na::Vector2::new(350.0, 0.0),
            na::Vector2::zeros(),
            0.0,
            0.0,
        );
        rig.snap();
        rig.update_from_input(
            na::Vector2::new(20.0, 0.0),
            na::Vector2::zeros(),
            0.0,
            0.0,
        );

        let gap = rig.dest_rotation().yaw - rig.current_rotation().yaw;
        assert!((gap - 20.0).abs() < EPSILON);
    }

    #[test]
    fn higher_smoothness_follows_slower() {
        let mut quick = rig();
        quick.set_smoothness(0.0);
        let mut slow = rig();
        slow.set_smoothness(MAX_SMOOTHNESS);

        for rig in [&mut quick, &mut slow].iter_mut() {
            rig.update_from_input(
                na::Vector2::new(90.0, 0.0),
                na::Vector2::zeros(),
                0.0,
                1.0 / 60.0,
            );
        }

        assert!(
            quick.current_rotation().yaw > slow.current_rotation().yaw
        );
        // factor 10 vs 1 over one frame
        assert!((quick.current_rotation().yaw - 15.0).abs() < EPSILON);
        assert!((slow.current_rotation().yaw - 1.5).abs() < EPSILON);
    }

    #[test]
    fn pan_moves_pivot_in_camera_plane() {
        let mut rig = rig();
        rig.update_from_input(
            na::Vector2::zeros(),
            na::Vector2::new(100.0, 0.0),
            0.0,
            0.0,
        );

        // 100 * 1.0 * 5.0 * 0.002
        assert!((rig.dest_pivot() - na::Vector3::new(1.0, 0.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn auto_rotate_advances_yaw() {
        let mut rig = rig();
        rig.set_auto_rotate(true, 30.0);
        idle(&mut rig, 60);
        assert!((rig.dest_rotation().yaw - 30.0).abs() < 1e-3);
    }

    #[test]
    fn applied_view_is_reached_smoothly() {
        let mut rig = rig();
        let view = CameraView {
            name: "three quarter".to_owned(),
            rotation: OrbitAngles::new(45.0, 20.0),
            distance: 3.0,
            pivot: na::Vector3::new(0.0, 1.0, 0.0),
            field_of_view: 40.0,
        };

        rig.apply_view(&view);
        assert_eq!(rig.current_rotation(), OrbitAngles::default());

        idle(&mut rig, 1);
        assert!(rig.current_rotation().yaw > 0.0);
        assert!(rig.current_rotation().yaw < 45.0);

        idle(&mut rig, 600);
        assert!((rig.current_rotation().yaw - 45.0).abs() < EPSILON);
        assert!((rig.current_distance() - 3.0).abs() < EPSILON);
        assert!((rig.current_fov() - 40.0).abs() < EPSILON);

        let captured = rig.capture_view("again");
        assert_eq!(captured.rotation, view.rotation);
        assert_eq!(captured.pivot, view.pivot);
        assert_eq!(captured.distance, view.distance);
        assert_eq!(captured.field_of_view, view.field_of_view);
    }

    #[test]
    fn world_transform_orbits_pivot() {
        let mut rig = rig();
        let view = CameraView {
            name: "top".to_owned(),
            rotation: OrbitAngles::new(0.0, 90.0),
            distance: 2.0,
            pivot: na::Vector3::new(1.0, 0.0, 0.0),
            field_of_view: 30.0,
        };
        rig.apply_view(&view);
        rig.snap();

        let (position, rotation) = rig.compute_world_transform();
        assert!((position - na::Vector3::new(1.0, 2.0, 0.0)).norm() < EPSILON);

        let forward = rotation * na::Vector3::z();
        assert!((forward - na::Vector3::new(0.0, -1.0, 0.0)).norm() < EPSILON);

        let iso = rig.isometry();
        assert!((iso.translation.vector - position).norm() < EPSILON);
    }
}
