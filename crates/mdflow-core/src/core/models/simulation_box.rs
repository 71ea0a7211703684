use super::state::StateError;
use nalgebra::{Matrix3, Vector3};

/// Periodic simulation cell.
///
/// The cell is stored as a matrix whose columns are the three lattice vectors,
/// together with its cached inverse. Orthorhombic cells take a fast path in
/// [`SimulationBox::minimum_image`]; triclinic cells go through fractional
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBox {
    cell: Matrix3<f64>,
    inverse: Matrix3<f64>,
    orthorhombic: bool,
}

impl SimulationBox {
    /// Creates an orthorhombic box with the given edge lengths in Å.
    pub fn orthorhombic(dimensions: Vector3<f64>) -> Result<Self, StateError> {
        if dimensions.iter().any(|&l| l <= 0.0 || !l.is_finite()) {
            return Err(StateError::InvalidBox(format!(
                "box dimensions must be positive and finite, got {:?}",
                dimensions.as_slice()
            )));
        }
        Self::from_cell(Matrix3::from_diagonal(&dimensions))
    }

    /// Creates a box from edge lengths (Å) and angles alpha, beta, gamma (degrees).
    ///
    /// The first lattice vector lies along x and the second in the xy plane.
    pub fn from_lengths_and_angles(
        lengths: Vector3<f64>,
        angles_deg: Vector3<f64>,
    ) -> Result<Self, StateError> {
        let (alpha, beta, gamma) = (
            angles_deg.x.to_radians(),
            angles_deg.y.to_radians(),
            angles_deg.z.to_radians(),
        );
        let a = Vector3::new(lengths.x, 0.0, 0.0);
        let b = Vector3::new(lengths.y * gamma.cos(), lengths.y * gamma.sin(), 0.0);
        let cx = lengths.z * beta.cos();
        let cy = lengths.z * (alpha.cos() - beta.cos() * gamma.cos()) / gamma.sin();
        let cz_sq = lengths.z * lengths.z - cx * cx - cy * cy;
        if cz_sq <= 0.0 || !cz_sq.is_finite() {
            return Err(StateError::InvalidBox(format!(
                "box angles {:?} do not describe a valid cell",
                angles_deg.as_slice()
            )));
        }
        let c = Vector3::new(cx, cy, cz_sq.sqrt());
        Self::from_cell(Matrix3::from_columns(&[a, b, c]))
    }

    /// Creates a box from a cell matrix whose columns are the lattice vectors.
    pub fn from_cell(cell: Matrix3<f64>) -> Result<Self, StateError> {
        let determinant = cell.determinant();
        if determinant <= 0.0 || !determinant.is_finite() {
            return Err(StateError::InvalidBox(
                "cell matrix must have a positive determinant".to_string(),
            ));
        }
        let inverse = cell
            .try_inverse()
            .ok_or_else(|| StateError::InvalidBox("cell matrix is singular".to_string()))?;
        let orthorhombic = cell.m12 == 0.0
            && cell.m13 == 0.0
            && cell.m21 == 0.0
            && cell.m23 == 0.0
            && cell.m31 == 0.0
            && cell.m32 == 0.0;
        Ok(Self {
            cell,
            inverse,
            orthorhombic,
        })
    }

    #[inline]
    pub fn cell(&self) -> &Matrix3<f64> {
        &self.cell
    }

    #[inline]
    pub fn is_orthorhombic(&self) -> bool {
        self.orthorhombic
    }

    /// Lengths of the three lattice vectors.
    pub fn dimensions(&self) -> Vector3<f64> {
        Vector3::new(
            self.cell.column(0).norm(),
            self.cell.column(1).norm(),
            self.cell.column(2).norm(),
        )
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.cell.determinant()
    }

    /// Distances between opposite faces of the cell.
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        let a = self.cell.column(0).into_owned();
        let b = self.cell.column(1).into_owned();
        let c = self.cell.column(2).into_owned();
        let volume = self.volume();
        Vector3::new(
            volume / b.cross(&c).norm(),
            volume / c.cross(&a).norm(),
            volume / a.cross(&b).norm(),
        )
    }

    #[inline]
    pub fn to_fractional(&self, position: &Vector3<f64>) -> Vector3<f64> {
        self.inverse * position
    }

    /// Maps a displacement into its minimum image.
    ///
    /// Returns the image displacement and the shift that was added to the raw
    /// displacement (`image = raw + shift`).
    #[inline]
    pub fn minimum_image(&self, displacement: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let shift = if self.orthorhombic {
            let l = Vector3::new(self.cell.m11, self.cell.m22, self.cell.m33);
            Vector3::new(
                -l.x * (displacement.x / l.x).round(),
                -l.y * (displacement.y / l.y).round(),
                -l.z * (displacement.z / l.z).round(),
            )
        } else {
            let fractional = self.inverse * displacement;
            -(self.cell * fractional.map(f64::round))
        };
        (displacement + shift, shift)
    }

    /// Scales the cell isotropically by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.cell *= factor;
        self.inverse /= factor;
    }
}
