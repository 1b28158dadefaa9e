//! Capacity planning
//!
//! Converts a target pod density into the number of new pods a run must
//! create. Occupancy is always supplied by the caller, so planning never
//! touches cluster state.

use crate::error::CapacityError;
use crate::models::CapacityRequest;

/// Deploy count for a request, always > 0 on success
pub fn plan(request: &CapacityRequest) -> Result<u64, CapacityError> {
    let target = i128::from(request.pods_per_node) * i128::from(request.node_count);
    let mut deploy = target - i128::from(request.already_running_on_target);

    if request.variant.halves_deploy_count() {
        // Floor toward negative infinity so odd deficits never round up to 0
        deploy = deploy.div_euclid(2);
    }

    if deploy <= 0 {
        return Err(CapacityError::NonPositiveDeployCount {
            computed: i64::try_from(deploy).unwrap_or(i64::MIN),
            pods_per_node: request.pods_per_node,
            node_count: request.node_count,
            already_running: request.already_running_on_target,
            variant: request.variant,
        });
    }

    Ok(u64::try_from(deploy).unwrap_or(u64::MAX))
}
