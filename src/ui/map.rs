use ratatui::{prelude::*, widgets::Widget};

use crate::simulation::{ObserverSnapshot, Terrain};

pub struct MapWidget<'a> {
    pub snapshot: &'a ObserverSnapshot,
}

fn terrain_cell(terrain: Terrain) -> (&'static str, Color) {
    match terrain {
        Terrain::Grassland => ("▓", Color::Rgb(90, 160, 70)),
        Terrain::Sand => ("▒", Color::Rgb(210, 190, 120)),
        Terrain::ShallowWater => ("≈", Color::Rgb(70, 130, 190)),
        Terrain::MediumWater => ("≈", Color::Rgb(50, 100, 160)),
        Terrain::DeepWater => ("·", Color::Rgb(35, 70, 120)),
        Terrain::Mountains => ("▲", Color::Rgb(140, 140, 140)),
        Terrain::Forest => ("▓", Color::Rgb(50, 110, 55)),
        Terrain::Jungle => ("▓", Color::Rgb(30, 130, 70)),
        Terrain::Marsh => ("▒", Color::Rgb(90, 120, 90)),
        Terrain::Snow => ("░", Color::White),
        Terrain::Savanna => ("▒", Color::Rgb(180, 170, 90)),
        Terrain::Hills => ("▒", Color::Rgb(130, 140, 90)),
        Terrain::Coral => ("▒", Color::Rgb(200, 110, 150)),
    }
}

impl<'a> Widget for MapWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let grid = &self.snapshot.grid;
        if grid.width == 0 || grid.height == 0 || area.width == 0 || area.height == 0 {
            return;
        }
        let year = self.snapshot.year;

        for y in 0..area.height {
            for x in 0..area.width {
                let gx = ((x as u32 * grid.width as u32) / area.width as u32)
                    .min(grid.width as u32 - 1) as u16;
                let gy = ((y as u32 * grid.height as u32) / area.height as u32)
                    .min(grid.height as u32 - 1) as u16;
                let (terrain, owner) = grid.at(gx, gy);

                let (glyph, color) = match owner {
                    Some((r, g, b)) => ("█", Color::Rgb(r, g, b)),
                    None => terrain_cell(terrain),
                };
                buf.set_string(area.x + x, area.y + y, glyph, Style::default().fg(color));
            }
        }

        // Battle tiles blink white/red with the calendar parity.
        for &(bx, by) in &self.snapshot.battles {
            if bx >= grid.width || by >= grid.height {
                continue;
            }
            let sx = area.x + ((bx as u32 * area.width as u32) / grid.width as u32) as u16;
            let sy = area.y + ((by as u32 * area.height as u32) / grid.height as u32) as u16;
            if sx >= area.x + area.width || sy >= area.y + area.height {
                continue;
            }
            let style = if year % 2 == 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::Red)
            };
            buf.set_string(sx, sy, "✸", style);
        }
    }
}
