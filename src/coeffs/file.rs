//! Text format of coefficient files
//!
//! ```text
//! #! FIELDS idx_s1 idx_s2 coeff aux_coeff description index
//! #! SET label bias.coeffs
//! #! SET nfields 6
//! #! SET ndimensions 2
//! #! SET number_of_coeffs 6
//! #! SET iteration_counter 10
//! #! SET shape_s1 3
//! #! SET type_s1 chebyshev-1st-kind
//! #! SET order_s1 2
//! #! SET interval_min_s1 -1
//! #! SET interval_max_s1 1
//! #! SET periodic_s1 false
//! #! SET labels_s1 T0(s),T1(s),T2(s)
//! ...
//!      0      0   1.0000000000000000e0   0.0000000000000000e0 T0(s)*1 0
//! ```
//!
//! Columns are located by the `FIELDS` line, so unknown fields and trailing columns are ignored.
//! The `aux_coeff` column is optional.

use crate::coeffs::dimension::DimensionInfo;
use crate::coeffs::vector::CoeffsVector;
use crate::error::CoeffsError;
use crate::index::IndexMap;
use crate::io::{write_atomically, write_set};

use itertools::Itertools;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

const INDEX_PREFIX: &str = "idx_";
const COEFF_FIELD: &str = "coeff";
const AUX_FIELD: &str = "aux_coeff";
const DESCRIPTION_FIELD: &str = "description";
const FLAT_INDEX_FIELD: &str = "index";

impl CoeffsVector {
    /// Write header and one record per flat index
    ///
    /// `aux` values, if given, are written to the `aux_coeff` column, they must have the same
    /// size as the tensor.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        aux: Option<&Array1<f64>>,
    ) -> Result<(), CoeffsError> {
        if let Some(aux) = aux {
            if aux.len() != self.size() {
                return Err(CoeffsError::shape_mismatch(self.shape(), &[aux.len()]));
            }
        }
        let mut fields: Vec<String> = self
            .dimensions()
            .iter()
            .map(|dim| format!("{INDEX_PREFIX}{}", dim.arg))
            .collect();
        fields.push(COEFF_FIELD.to_owned());
        if aux.is_some() {
            fields.push(AUX_FIELD.to_owned());
        }
        fields.push(DESCRIPTION_FIELD.to_owned());
        fields.push(FLAT_INDEX_FIELD.to_owned());

        writeln!(writer, "#! FIELDS {}", fields.iter().join(" "))?;
        write_set(writer, "label", self.label())?;
        write_set(writer, "nfields", fields.len())?;
        write_set(writer, "ndimensions", self.ndim())?;
        write_set(writer, "number_of_coeffs", self.size())?;
        write_set(writer, "iteration_counter", self.counter())?;
        for (dim, &size) in self.dimensions().iter().zip(self.shape()) {
            let arg = &dim.arg;
            write_set(writer, &format!("shape_{arg}"), size)?;
            write_set(writer, &format!("type_{arg}"), &dim.kind)?;
            write_set(writer, &format!("order_{arg}"), dim.order)?;
            write_set(writer, &format!("interval_min_{arg}"), dim.min)?;
            write_set(writer, &format!("interval_max_{arg}"), dim.max)?;
            write_set(writer, &format!("periodic_{arg}"), dim.periodic)?;
            write_set(writer, &format!("labels_{arg}"), dim.labels.iter().join(","))?;
        }

        for (flat, index) in self.index_map().iter().enumerate() {
            for i in index.iter() {
                write!(writer, "{i:>6} ")?;
            }
            write!(writer, "{:>24.16e}", self.values()[flat])?;
            if let Some(aux) = aux {
                write!(writer, " {:>24.16e}", aux[flat])?;
            }
            writeln!(writer, " {} {flat}", self.description_of(&index))?;
        }
        Ok(())
    }

    /// Write to a file through a temporary sibling, so an interrupted write never leaves a
    /// truncated file in place
    pub fn write_to_path(
        &self,
        path: impl AsRef<Path>,
        aux: Option<&Array1<f64>>,
    ) -> Result<(), CoeffsError> {
        write_atomically(path.as_ref(), |writer| self.write_to(writer, aux))
    }

    /// Build a new tensor with the shape and descriptions given by the file header
    ///
    /// Returns the tensor and the auxiliary column, if the file has one.
    pub fn create_from<R: BufRead>(
        reader: R,
    ) -> Result<(Self, Option<Array1<f64>>), CoeffsError> {
        let file = ParsedFile::parse(reader)?;
        let label = file.label.clone().unwrap_or_else(|| "coeffs".to_owned());
        let mut coeffs = Self::new(&label, file.dimensions.clone())?;
        let aux = coeffs.assign_records(&file)?;
        Ok((coeffs, aux))
    }

    pub fn create_from_path(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Option<Array1<f64>>), CoeffsError> {
        Self::create_from(BufReader::new(File::open(path)?))
    }

    /// Load values and the iteration counter into an existing tensor
    ///
    /// If `check_shape` is set, the file must have exactly the shape of the tensor. Otherwise
    /// records may cover a part of the tensor, entries without a record keep their current
    /// values, and any record outside of the tensor is still an error. Returns the auxiliary column, if the file has one.
    pub fn read_from<R: BufRead>(
        &mut self,
        reader: R,
        check_shape: bool,
    ) -> Result<Option<Array1<f64>>, CoeffsError> {
        let file = ParsedFile::parse(reader)?;
        if check_shape && file.shape() != self.shape() {
            return Err(CoeffsError::SizeMismatch {
                expected: self.shape().to_vec(),
                found: file.shape(),
            });
        }
        self.assign_records(&file)
    }

    pub fn read_from_path(
        &mut self,
        path: impl AsRef<Path>,
        check_shape: bool,
    ) -> Result<Option<Array1<f64>>, CoeffsError> {
        self.read_from(BufReader::new(File::open(path)?), check_shape)
    }

    fn assign_records(&mut self, file: &ParsedFile) -> Result<Option<Array1<f64>>, CoeffsError> {
        let mut seen = vec![false; self.size()];
        let mut aux = file.has_aux.then(|| Array1::zeros(self.size()));
        for record in file.records.iter() {
            let flat = self.flatten(&record.index)?;
            if seen[flat] {
                return Err(CoeffsError::format(
                    record.line,
                    format!("duplicate record for index {:?}", record.index),
                ));
            }
            seen[flat] = true;
            self.values_mut()[flat] = record.value;
            if let (Some(aux), Some(value)) = (aux.as_mut(), record.aux) {
                aux[flat] = value;
            }
        }
        self.set_counter(file.counter);
        Ok(aux)
    }
}

struct Record {
    line: usize,
    index: Vec<usize>,
    value: f64,
    aux: Option<f64>,
    flat: Option<usize>,
}

struct Columns {
    index: Vec<usize>,
    value: usize,
    aux: Option<usize>,
    flat: Option<usize>,
    total: usize,
}

impl Columns {
    fn from_fields(fields: &[String], line: usize) -> Result<Self, CoeffsError> {
        let position = |name: &str| fields.iter().position(|field| field == name);
        let index: Vec<_> = fields
            .iter()
            .positions(|field| field.starts_with(INDEX_PREFIX))
            .collect();
        if index.is_empty() {
            return Err(CoeffsError::format(line, "FIELDS has no index columns"));
        }
        let value = position(COEFF_FIELD)
            .ok_or_else(|| CoeffsError::format(line, "FIELDS has no coeff column"))?;
        Ok(Self {
            index,
            value,
            aux: position(AUX_FIELD),
            flat: position(FLAT_INDEX_FIELD),
            total: fields.len(),
        })
    }
}

struct ParsedFile {
    label: Option<String>,
    counter: u64,
    dimensions: Vec<DimensionInfo>,
    has_aux: bool,
    records: Vec<Record>,
}

impl ParsedFile {
    fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(DimensionInfo::size).collect()
    }

    fn parse<R: BufRead>(reader: R) -> Result<Self, CoeffsError> {
        let mut fields: Option<(Vec<String>, Columns)> = None;
        let mut header = Header::default();
        let mut records = vec![];
        let mut last_line = 0;

        for (i, line) in reader.lines().enumerate() {
            let line_number = i + 1;
            last_line = line_number;
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("#!") {
                let mut tokens = rest.split_whitespace();
                match tokens.next() {
                    Some("FIELDS") => {
                        if fields.is_some() {
                            return Err(CoeffsError::format(line_number, "repeated FIELDS line"));
                        }
                        let names: Vec<String> = tokens.map(str::to_owned).collect();
                        let columns = Columns::from_fields(&names, line_number)?;
                        fields = Some((names, columns));
                    }
                    Some("SET") => {
                        let key = tokens
                            .next()
                            .ok_or_else(|| CoeffsError::format(line_number, "SET without key"))?;
                        let value = tokens.join(" ");
                        header.values.insert(key.to_owned(), (value, line_number));
                    }
                    _ => {}
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            let (_, columns) = fields.as_ref().ok_or_else(|| {
                CoeffsError::format(line_number, "record found before the FIELDS line")
            })?;
            records.push(parse_record(line, line_number, columns)?);
        }

        let (names, columns) =
            fields.ok_or_else(|| CoeffsError::format(last_line, "no FIELDS line"))?;
        let args: Vec<&str> = columns
            .index
            .iter()
            .map(|&i| &names[i][INDEX_PREFIX.len()..])
            .collect();

        let ndim: usize = header.required("ndimensions", last_line)?;
        if ndim != args.len() {
            return Err(header.error(
                "ndimensions",
                format!("{ndim} dimensions are declared, but {} index columns are present", args.len()),
            ));
        }
        let dimensions = args
            .iter()
            .map(|arg| header.dimension(arg, last_line))
            .collect::<Result<Vec<_>, _>>()?;
        let shape: Vec<usize> = dimensions.iter().map(DimensionInfo::size).collect();
        let map = IndexMap::new(shape.clone())
            .map_err(|e| CoeffsError::format(last_line, e.to_string()))?;

        let declared: usize = header.required("number_of_coeffs", last_line)?;
        if declared != map.size() {
            return Err(header.error(
                "number_of_coeffs",
                format!("{declared} coefficients are declared for shape {shape:?}"),
            ));
        }
        if declared != records.len() {
            return Err(header.error(
                "number_of_coeffs",
                format!("{declared} coefficients are declared, but {} records are present", records.len()),
            ));
        }
        for record in records.iter() {
            if let Some(actual) = record.flat {
                let expected = map
                    .flatten(&record.index)
                    .map_err(|e| CoeffsError::format(record.line, e.to_string()))?;
                if actual != expected {
                    return Err(CoeffsError::format(
                        record.line,
                        format!("index column is {actual}, but multi-index gives {expected}"),
                    ));
                }
            }
        }

        Ok(Self {
            label: header.optional("label")?,
            counter: header.optional("iteration_counter")?.unwrap_or(0),
            dimensions,
            has_aux: columns.aux.is_some(),
            records,
        })
    }
}

fn parse_record(line: &str, line_number: usize, columns: &Columns) -> Result<Record, CoeffsError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < columns.total {
        return Err(CoeffsError::format(
            line_number,
            format!("{} columns are expected, {} are found", columns.total, tokens.len()),
        ));
    }
    let parse_column = |column: usize| -> Result<f64, CoeffsError> {
        parse_token(tokens[column], line_number)
    };
    let index = columns
        .index
        .iter()
        .map(|&column| parse_token(tokens[column], line_number))
        .collect::<Result<Vec<usize>, _>>()?;
    Ok(Record {
        line: line_number,
        index,
        value: parse_column(columns.value)?,
        aux: columns.aux.map(parse_column).transpose()?,
        flat: columns
            .flat
            .map(|column| parse_token(tokens[column], line_number))
            .transpose()?,
    })
}

fn parse_token<T: FromStr>(token: &str, line: usize) -> Result<T, CoeffsError> {
    token
        .parse()
        .map_err(|_| CoeffsError::format(line, format!("cannot parse {token:?}")))
}

#[derive(Default)]
struct Header {
    values: BTreeMap<String, (String, usize)>,
}

impl Header {
    fn error(&self, key: &str, reason: String) -> CoeffsError {
        let line = self.values.get(key).map_or(0, |(_, line)| *line);
        CoeffsError::format(line, reason)
    }

    fn optional<T: FromStr>(&self, key: &str) -> Result<Option<T>, CoeffsError> {
        self.values
            .get(key)
            .map(|(value, line)| parse_token(value, *line))
            .transpose()
    }

    fn required<T: FromStr>(&self, key: &str, last_line: usize) -> Result<T, CoeffsError> {
        self.optional(key)?.ok_or_else(|| {
            CoeffsError::format(last_line, format!("header has no {key:?} entry"))
        })
    }

    fn dimension(&self, arg: &str, last_line: usize) -> Result<DimensionInfo, CoeffsError> {
        let size: usize = self.required(&format!("shape_{arg}"), last_line)?;
        let mut dim = DimensionInfo::plain(arg, size);
        if let Some(kind) = self.optional(&format!("type_{arg}"))? {
            dim.kind = kind;
        }
        if let Some(order) = self.optional(&format!("order_{arg}"))? {
            dim.order = order;
        }
        if let Some(min) = self.optional(&format!("interval_min_{arg}"))? {
            dim.min = min;
        }
        if let Some(max) = self.optional(&format!("interval_max_{arg}"))? {
            dim.max = max;
        }
        if let Some(periodic) = self.optional(&format!("periodic_{arg}"))? {
            dim.periodic = periodic;
        }
        let labels_key = format!("labels_{arg}");
        if let Some(labels) = self.optional::<String>(&labels_key)? {
            let labels: Vec<String> = labels.split(',').map(str::to_owned).collect();
            if labels.len() != size {
                return Err(self.error(
                    &labels_key,
                    format!("{} labels are given for {size} basis functions", labels.len()),
                ));
            }
            dim.labels = labels;
        }
        Ok(dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisFunctions;
    use crate::error::IndexError;

    use ndarray::Array1;
    use rand::prelude::*;
    use rand_distr::StandardNormal;

    fn random_coeffs(rng: &mut StdRng) -> CoeffsVector {
        let basis = [
            BasisFunctions::chebyshev(3, -2.0, 2.0).unwrap(),
            BasisFunctions::fourier(2, -std::f64::consts::PI, std::f64::consts::PI).unwrap(),
        ];
        let mut coeffs = CoeffsVector::from_basis("bias.coeffs", &["d1", "phi"], &basis).unwrap();
        coeffs
            .values_mut()
            .mapv_inplace(|_| rng.sample::<f64, _>(StandardNormal) * 1e3);
        coeffs.set_counter(17);
        coeffs
    }

    fn to_string(coeffs: &CoeffsVector, aux: Option<&Array1<f64>>) -> String {
        let mut buffer = vec![];
        coeffs.write_to(&mut buffer, aux).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        let coeffs = random_coeffs(&mut rng);
        let aux = coeffs.values().mapv(|x| 0.5 * x);
        let text = to_string(&coeffs, Some(&aux));

        let (restored, restored_aux) = CoeffsVector::create_from(text.as_bytes()).unwrap();
        assert_eq!(restored.shape(), coeffs.shape());
        assert_eq!(restored.values(), coeffs.values());
        assert_eq!(restored.counter(), 17);
        assert_eq!(restored.label(), "bias.coeffs");
        assert_eq!(restored.dimensions(), coeffs.dimensions());
        assert_eq!(restored_aux.unwrap(), aux);
    }

    #[test]
    fn read_into_existing() {
        let mut rng = StdRng::seed_from_u64(1);
        let coeffs = random_coeffs(&mut rng);
        let text = to_string(&coeffs, None);
        let mut target = coeffs.zeros_like("target");
        let aux = target.read_from(text.as_bytes(), true).unwrap();
        assert!(aux.is_none());
        assert_eq!(target.values(), coeffs.values());
        assert_eq!(target.counter(), coeffs.counter());
    }

    #[test]
    fn size_mismatch() {
        let mut rng = StdRng::seed_from_u64(2);
        let coeffs = random_coeffs(&mut rng);
        let text = to_string(&coeffs, None);
        let basis = [BasisFunctions::chebyshev(3, -2.0, 2.0).unwrap()];
        let mut other = CoeffsVector::from_basis("other", &["d1"], &basis).unwrap();
        assert!(matches!(
            other.read_from(text.as_bytes(), true),
            Err(CoeffsError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn uncovered_entries_keep_values() {
        let small_basis = [BasisFunctions::legendre(1, -1.0, 1.0).unwrap()];
        let mut small = CoeffsVector::from_basis("small", &["s"], &small_basis).unwrap();
        small.fill(-2.0);
        small.set_counter(4);
        let text = to_string(&small, None);

        let large_basis = [BasisFunctions::legendre(3, -1.0, 1.0).unwrap()];
        let mut large = CoeffsVector::from_basis("large", &["s"], &large_basis).unwrap();
        large.fill(5.0);
        large.read_from(text.as_bytes(), false).unwrap();
        assert_eq!(large.values(), &Array1::from(vec![-2.0, -2.0, 5.0, 5.0]));
        assert_eq!(large.counter(), 4);
    }

    #[test]
    fn smaller_file_without_shape_check() {
        let small_basis = [
            BasisFunctions::chebyshev(1, -2.0, 2.0).unwrap(),
            BasisFunctions::chebyshev(1, -2.0, 2.0).unwrap(),
        ];
        let mut small = CoeffsVector::from_basis("small", &["a", "b"], &small_basis).unwrap();
        small.fill(1.0);
        let text = to_string(&small, None);

        let large_basis = [
            BasisFunctions::chebyshev(2, -2.0, 2.0).unwrap(),
            BasisFunctions::chebyshev(2, -2.0, 2.0).unwrap(),
        ];
        let mut large = CoeffsVector::from_basis("large", &["a", "b"], &large_basis).unwrap();
        large.read_from(text.as_bytes(), false).unwrap();
        assert_eq!(large.at(&[1, 1]).unwrap(), 1.0);
        assert_eq!(large.at(&[2, 0]).unwrap(), 0.0);

        // the other way around records do not fit
        let text = to_string(&large, None);
        assert!(matches!(
            small.read_from(text.as_bytes(), false),
            Err(CoeffsError::Index(IndexError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let text = "\
#! FIELDS idx_s coeff future_column description index
#! SET ndimensions 1
#! SET number_of_coeffs 3
#! SET iteration_counter 4
#! SET shape_s 3
#! SET unknown_key some value
     0   1.5 0.1 T0(s) 0 extra trailing columns
     1  -2.5 0.2 T1(s) 1
# comment
     2   3.0e-1 0.3 T2(s) 2
";
        let (coeffs, aux) = CoeffsVector::create_from(text.as_bytes()).unwrap();
        assert!(aux.is_none());
        assert_eq!(coeffs.shape(), &[3]);
        assert_eq!(coeffs.values().to_vec(), vec![1.5, -2.5, 0.3]);
        assert_eq!(coeffs.counter(), 4);
        assert_eq!(coeffs.dimensions()[0].kind, "unknown");
    }

    #[test]
    fn record_count_mismatch() {
        let text = "\
#! FIELDS idx_s coeff
#! SET ndimensions 1
#! SET number_of_coeffs 3
#! SET shape_s 3
0 1.0
1 2.0
";
        assert!(matches!(
            CoeffsVector::create_from(text.as_bytes()),
            Err(CoeffsError::Format { line: 3, .. })
        ));
    }

    #[test]
    fn declared_shape_mismatch() {
        let text = "\
#! FIELDS idx_s coeff
#! SET ndimensions 1
#! SET number_of_coeffs 2
#! SET shape_s 3
0 1.0
1 2.0
";
        assert!(matches!(
            CoeffsVector::create_from(text.as_bytes()),
            Err(CoeffsError::Format { .. })
        ));
    }

    #[test]
    fn flat_index_mismatch() {
        let text = "\
#! FIELDS idx_a idx_b coeff index
#! SET ndimensions 2
#! SET number_of_coeffs 2
#! SET shape_a 1
#! SET shape_b 2
0 0 1.0 0
0 1 2.0 5
";
        assert!(matches!(
            CoeffsVector::create_from(text.as_bytes()),
            Err(CoeffsError::Format { line: 7, .. })
        ));
    }

    #[test]
    fn duplicate_record() {
        let text = "\
#! FIELDS idx_s coeff
#! SET ndimensions 1
#! SET number_of_coeffs 2
#! SET shape_s 2
0 1.0
0 2.0
";
        assert!(matches!(
            CoeffsVector::create_from(text.as_bytes()),
            Err(CoeffsError::Format { line: 6, .. })
        ));
    }

    #[test]
    fn unparsable_value() {
        let text = "\
#! FIELDS idx_s coeff
#! SET ndimensions 1
#! SET number_of_coeffs 1
#! SET shape_s 1
0 one
";
        assert!(matches!(
            CoeffsVector::create_from(text.as_bytes()),
            Err(CoeffsError::Format { line: 5, .. })
        ));
    }

    #[test]
    fn path_round_trip() {
        let mut rng = StdRng::seed_from_u64(3);
        let coeffs = random_coeffs(&mut rng);
        let path = crate::io::test_dir("coeffs-path").join("coeffs.data");
        coeffs.write_to_path(&path, None).unwrap();
        let (restored, _) = CoeffsVector::create_from_path(&path).unwrap();
        assert_eq!(restored.values(), coeffs.values());
        let mut existing = coeffs.zeros_like("existing");
        existing.read_from_path(&path, true).unwrap();
        assert_eq!(existing.values(), coeffs.values());
    }

    #[test]
    fn fixture_files() {
        for (name, text) in variational_bias_test_util::COEFFS_FILES.iter() {
            let result = CoeffsVector::create_from(text.as_bytes());
            if name.starts_with("invalid") {
                assert!(result.is_err(), "{name} must be rejected");
            } else {
                let (coeffs, _) = result.unwrap();
                assert_eq!(coeffs.values().len(), coeffs.size(), "{name}");
            }
        }
    }
}
